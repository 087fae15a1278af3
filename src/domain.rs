//! Domain models for regulation hierarchies.
//!
//! This module contains the hierarchy types and their numbering patterns, the
//! line classifier, the stored entry and regulation types, and configuration.

/// Hierarchy types and their ordered pattern groups.
pub mod hierarchy;
pub use hierarchy::{HierarchyType, PatternGroup, PatternTable, UnknownHierarchyType};

pub mod classifier;
pub use classifier::{Classifier, Match};

mod config;
pub use config::{Config, ConfigError};

mod entry;
pub use entry::{
    checksum, extract_meta_data, Entry, EntryId, HierarchyPath, NewEntry, NewRegulation,
    Regulation, RegulationId,
};

mod lineage;
pub use lineage::{Lineage, Tagged};

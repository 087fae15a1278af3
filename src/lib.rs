//! Plain-text Regulation Hierarchies
//!
//! Regulations are plain-text documents whose headings follow a numbering
//! convention. They are annotated with heading markers, segmented into blocks
//! and stored as a tree of entries that can be searched and walked.

pub mod domain;
pub use domain::{Config, Entry, EntryId, HierarchyType, Lineage, Regulation, RegulationId};

/// Heading annotation and block segmentation.
pub mod outline;

/// Storage backends for regulations and entries.
pub mod storage;
pub use storage::{MemoryStore, SqliteStore, Store};

pub mod import;
pub use import::{Annotator, Importer, Outcome};

pub mod query;
pub use query::{deduplicate, Query};

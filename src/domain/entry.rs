use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

id_type!(
    /// Opaque identifier of a stored [`Entry`].
    EntryId
);

id_type!(
    /// Opaque identifier of a stored [`Regulation`].
    RegulationId
);

/// The unit numbers of an entry's ancestors, root first, followed by its own.
///
/// Ancestors without a unit number are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyPath {
    /// Unit numbers from the root to the entry itself.
    pub levels: Vec<String>,
}

impl HierarchyPath {
    /// Extends this path with a child's unit number.
    ///
    /// Surrounding whitespace of the token is not part of the path. Without a
    /// unit number the child's path equals this one.
    #[must_use]
    pub fn child(&self, unit_number: Option<&str>) -> Self {
        let mut levels = self.levels.clone();
        if let Some(unit) = unit_number {
            levels.push(unit.trim().to_string());
        }
        Self { levels }
    }
}

/// An entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// The regulation the entry belongs to.
    pub regulation_id: RegulationId,
    /// The enclosing entry, if any.
    pub parent_id: Option<EntryId>,
    /// Nesting level; `0` for text that is not under a heading.
    pub level: u32,
    /// The literal numbering token of the heading.
    pub unit_number: Option<String>,
    /// Heading text followed by its continuation lines.
    pub content: String,
    /// Unit numbers from the root down to this entry.
    pub hierarchy_path: HierarchyPath,
}

impl NewEntry {
    /// Attaches the identifier assigned by a store.
    #[must_use]
    pub fn into_entry(self, id: EntryId) -> Entry {
        Entry {
            id,
            regulation_id: self.regulation_id,
            parent_id: self.parent_id,
            level: self.level,
            unit_number: self.unit_number,
            content: self.content,
            hierarchy_path: self.hierarchy_path,
        }
    }
}

/// A node of a regulation's hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Identifier assigned by the store.
    pub id: EntryId,
    /// The regulation the entry belongs to.
    pub regulation_id: RegulationId,
    /// The enclosing entry, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntryId>,
    /// Nesting level; `0` for text that is not under a heading.
    pub level: u32,
    /// The literal numbering token of the heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_number: Option<String>,
    /// Heading text followed by its continuation lines.
    pub content: String,
    /// Unit numbers from the root down to this entry.
    pub hierarchy_path: HierarchyPath,
}

impl Entry {
    /// The first line of the content, trimmed.
    #[must_use]
    pub fn heading(&self) -> &str {
        self.content.lines().next().unwrap_or_default().trim()
    }
}

/// A regulation that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegulation {
    /// Unique title, taken from the source file name.
    pub title: String,
    /// The preamble before the body of the regulation.
    pub meta_data: String,
    /// The complete source text.
    pub full_text: String,
    /// SHA-256 of the source text, hex encoded.
    pub checksum: String,
    /// When the regulation was imported.
    pub imported_at: DateTime<Utc>,
}

impl NewRegulation {
    /// Builds a regulation from its source text.
    ///
    /// Everything up to and including the first line containing `marker` is
    /// the preamble. Without the marker the whole text is the preamble.
    #[must_use]
    pub fn from_source(title: String, full_text: String, marker: &str) -> Self {
        let meta_data = extract_meta_data(&full_text, marker).to_string();
        let checksum = checksum(&full_text);
        Self {
            title,
            meta_data,
            full_text,
            checksum,
            imported_at: Utc::now(),
        }
    }

    /// Attaches the identifier assigned by a store.
    #[must_use]
    pub fn into_regulation(self, id: RegulationId) -> Regulation {
        Regulation {
            id,
            title: self.title,
            meta_data: self.meta_data,
            full_text: self.full_text,
            checksum: self.checksum,
            imported_at: self.imported_at,
        }
    }
}

/// A stored regulation document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regulation {
    /// Identifier assigned by the store.
    pub id: RegulationId,
    /// Unique title, taken from the source file name.
    pub title: String,
    /// The preamble before the body of the regulation.
    pub meta_data: String,
    /// The complete source text.
    pub full_text: String,
    /// SHA-256 of the source text, hex encoded.
    pub checksum: String,
    /// When the regulation was imported.
    pub imported_at: DateTime<Utc>,
}

/// Returns the preamble of a regulation.
///
/// The preamble runs up to the end of the first line containing `marker`. If
/// the marker never occurs the whole text is returned.
#[must_use]
pub fn extract_meta_data<'t>(text: &'t str, marker: &str) -> &'t str {
    let Some(start) = text.find(marker) else {
        return text;
    };
    let end = text[start..].find('\n').map_or(text.len(), |n| start + n);
    &text[..end]
}

/// SHA-256 of `text`, hex encoded.
#[must_use]
pub fn checksum(text: &str) -> String {
    let hash = Sha256::digest(text.as_bytes());
    format!("{hash:x}")
}

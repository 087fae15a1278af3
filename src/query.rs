//! Read-side helpers over a [`Store`].

use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    domain::{Entry, EntryId, Lineage, Regulation},
    storage::{SearchQuery, Store, StoreError},
};

/// Errors raised by [`Query`].
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// No regulation has this title.
    #[error("regulation '{0}' not found")]
    NotFound(String),

    /// The search pattern is not a valid regular expression.
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// An exported file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A regulation with all of its entries in document order.
#[derive(Debug, Clone, Serialize)]
pub struct RegulationView {
    /// The regulation itself.
    pub regulation: Regulation,
    /// Its entries, in document order.
    pub entries: Vec<Entry>,
}

/// Queries against a store.
#[derive(Debug)]
pub struct Query<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> Query<'a, S> {
    /// Wraps a store.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Entries whose content matches `pattern`.
    ///
    /// With a `regulation` title only that regulation is searched. An unknown
    /// title matches nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid or the store fails.
    #[instrument(level = "debug", skip(self))]
    pub fn search(
        &self,
        pattern: &str,
        regulation: Option<&str>,
        case_insensitive: bool,
    ) -> Result<Vec<Entry>, QueryError> {
        let mut query = SearchQuery::new(pattern, case_insensitive)?;
        if let Some(title) = regulation {
            let Some(found) = self.store.find_regulation(title)? else {
                debug!("No regulation titled {title}");
                return Ok(Vec::new());
            };
            query = query.within(found.id);
        }
        Ok(self.store.search(&query)?)
    }

    /// An entry with its ancestors and descendants.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RootCount`] (wrapped) unless exactly one entry has
    /// the id.
    pub fn lineage(&self, id: EntryId) -> Result<Lineage, QueryError> {
        Ok(self.store.lineage(id)?)
    }

    /// The content of every ancestor of an entry followed by its own content.
    ///
    /// # Errors
    ///
    /// See [`Query::lineage`].
    pub fn ancestor_content(&self, id: EntryId) -> Result<String, QueryError> {
        Ok(self.lineage(id)?.joined_content())
    }

    /// The unit numbers from the root down to an entry, joined with `", "`.
    ///
    /// # Errors
    ///
    /// See [`Query::lineage`].
    pub fn ancestor_unit_numbers(&self, id: EntryId) -> Result<String, QueryError> {
        Ok(self.lineage(id)?.joined_unit_numbers())
    }

    /// A regulation and all of its entries.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotFound`] for an unknown title.
    pub fn regulation(&self, title: &str) -> Result<RegulationView, QueryError> {
        let regulation = self
            .store
            .find_regulation(title)?
            .ok_or_else(|| QueryError::NotFound(title.to_string()))?;
        let entries = self.store.entries(regulation.id)?;
        Ok(RegulationView {
            regulation,
            entries,
        })
    }

    /// Writes every entry of a regulation to its own file.
    ///
    /// Files go into `<dir>/<title>/` and are named after the first line of
    /// the entry. Path separators in the name are replaced and long names are
    /// cut to fit the file system. A name that is empty or already taken falls
    /// back to the entry id. Returns the written
    /// paths in document order.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown title or if a file cannot be written.
    #[instrument(level = "debug", skip(self))]
    pub fn export(&self, title: &str, dir: &Path) -> Result<Vec<PathBuf>, QueryError> {
        let view = self.regulation(title)?;
        let target = dir.join(file_name(title));
        std::fs::create_dir_all(&target).map_err(|source| QueryError::Io {
            path: target.clone(),
            source,
        })?;

        let mut used = HashSet::new();
        let mut written = Vec::with_capacity(view.entries.len());
        for entry in &view.entries {
            let mut name = file_name(entry.heading());
            if name.is_empty() || !used.insert(name.clone()) {
                name = entry.id.to_string();
                used.insert(name.clone());
            }

            let path = target.join(name);
            std::fs::write(&path, &entry.content).map_err(|source| QueryError::Io {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }

        debug!("Exported {} entries of {title}", written.len());
        Ok(written)
    }
}

/// Longest file name, in bytes, that common file systems accept.
const MAX_NAME_BYTES: usize = 255;

fn file_name(text: &str) -> String {
    let mut name = text.trim().replace(['/', '\\'], "_");
    if name.len() > MAX_NAME_BYTES {
        let end = name
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take_while(|&end| end <= MAX_NAME_BYTES)
            .last()
            .unwrap_or(0);
        name.truncate(end);
        name.truncate(name.trim_end().len());
    }
    name
}

/// Removes items that contain a shorter item.
///
/// Items are ordered by length (stable for equal lengths). Whenever an item
/// occurs inside a longer one, the longer one is blanked. A blank item occurs
/// inside everything, so once one item is blanked every longer item after it
/// is dropped as well, and a blank input drops everything after it.
#[must_use]
pub fn deduplicate(mut items: Vec<String>) -> Vec<String> {
    items.sort_by_key(String::len);
    for i in 0..items.len() {
        let (head, tail) = items.split_at_mut(i + 1);
        let shorter = &head[i];
        for longer in tail {
            if longer.contains(shorter.as_str()) {
                longer.clear();
            }
        }
    }
    items.retain(|item| !item.is_empty());
    items
}

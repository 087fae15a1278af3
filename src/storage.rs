//! Persistence of regulations and their entries.
//!
//! The [`Store`] trait is the only way the import pipeline and the query
//! helpers talk to storage. Two implementations are provided: an in-memory
//! graph ([`MemoryStore`]) and a SQLite database ([`SqliteStore`]).

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};

use crate::domain::{
    Entry, EntryId, Lineage, NewEntry, NewRegulation, Regulation, RegulationId,
};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors reported by a [`Store`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A regulation with this title has already been stored.
    #[error("regulation '{0}' already exists")]
    DuplicateTitle(String),

    /// A lineage lookup did not find exactly one entry for the id.
    #[error("expected exactly one entry with id {id}, found {found}")]
    RootCount {
        /// The requested entry.
        id: EntryId,
        /// How many entries matched.
        found: usize,
    },

    /// An entry refers to a parent that has not been stored.
    #[error("parent entry {0} does not exist")]
    MissingParent(EntryId),

    /// An entry refers to a regulation that has not been stored.
    #[error("regulation {0} does not exist")]
    MissingRegulation(RegulationId),

    /// A stored record could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The underlying database failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Another thread panicked while holding the store's lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// A full-text search over entry content.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pattern: Regex,
    regulation: Option<RegulationId>,
}

impl SearchQuery {
    /// Creates a query matching `pattern` anywhere in an entry's content.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn new(pattern: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self {
            pattern,
            regulation: None,
        })
    }

    /// Restricts the query to the entries of one regulation.
    #[must_use]
    pub const fn within(mut self, regulation: RegulationId) -> Self {
        self.regulation = Some(regulation);
        self
    }

    /// Whether an entry satisfies the query.
    #[must_use]
    pub fn matches(&self, entry: &Entry) -> bool {
        self.regulation.is_none_or(|id| entry.regulation_id == id)
            && self.pattern.is_match(&entry.content)
    }

    /// The regulation the query is restricted to, if any.
    #[must_use]
    pub const fn regulation(&self) -> Option<RegulationId> {
        self.regulation
    }
}

/// Storage for regulations and their hierarchy of entries.
///
/// Implementations must accept concurrent inserts from independent import
/// workers. An id returned by an insert is usable as a parent reference
/// immediately.
pub trait Store: Send + Sync {
    /// Stores a regulation and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateTitle`] if the title is already stored.
    fn insert_regulation(&self, regulation: NewRegulation) -> Result<RegulationId, StoreError>;

    /// Stores an entry and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry's regulation or parent is not stored.
    fn insert_entry(&self, entry: NewEntry) -> Result<EntryId, StoreError>;

    /// Finds a regulation by its title.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn find_regulation(&self, title: &str) -> Result<Option<Regulation>, StoreError>;

    /// The titles of all stored regulations.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn titles(&self) -> Result<BTreeSet<String>, StoreError>;

    /// All entries of a regulation, in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn entries(&self, regulation: RegulationId) -> Result<Vec<Entry>, StoreError>;

    /// An entry with its depth-tagged ancestors and descendants.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RootCount`] unless exactly one entry has the id.
    fn lineage(&self, id: EntryId) -> Result<Lineage, StoreError>;

    /// Entries matching a search query, in document order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn search(&self, query: &SearchQuery) -> Result<Vec<Entry>, StoreError>;
}

#[cfg(test)]
pub(crate) mod tests {
    //! Behaviour every [`Store`] implementation must share.

    use super::*;
    use crate::domain::HierarchyPath;

    pub fn regulation(title: &str) -> NewRegulation {
        NewRegulation::from_source(
            title.to_string(),
            format!("{title}\n修正日期：民國 110 年\n第一章 總則"),
            "修正日期：",
        )
    }

    pub fn entry(
        regulation_id: RegulationId,
        parent: Option<(EntryId, &HierarchyPath)>,
        level: u32,
        unit: &str,
        content: &str,
    ) -> NewEntry {
        let path = parent.map_or_else(HierarchyPath::default, |(_, path)| path.clone());
        NewEntry {
            regulation_id,
            parent_id: parent.map(|(id, _)| id),
            level,
            unit_number: Some(unit.to_string()),
            content: content.to_string(),
            hierarchy_path: path.child(Some(unit)),
        }
    }

    /// Stores `章 > 節 > 條, 條` and returns the ids in insertion order.
    pub fn seed(store: &dyn Store) -> (RegulationId, Vec<EntryId>) {
        let reg = store.insert_regulation(regulation("民法")).unwrap();

        let chapter = entry(reg, None, 1, "第一章", "第一章 總則");
        let chapter_path = chapter.hierarchy_path.clone();
        let chapter_id = store.insert_entry(chapter).unwrap();

        let section = entry(reg, Some((chapter_id, &chapter_path)), 2, "第一節", "第一節 通則");
        let section_path = section.hierarchy_path.clone();
        let section_id = store.insert_entry(section).unwrap();

        let first = entry(
            reg,
            Some((section_id, &section_path)),
            3,
            "第 1 條",
            "第 1 條 民事，法律所未規定者，依習慣。",
        );
        let first_id = store.insert_entry(first).unwrap();

        let second = entry(
            reg,
            Some((section_id, &section_path)),
            3,
            "第 2 條",
            "第 2 條 民事所適用之習慣，以不背於公共秩序者為限。",
        );
        let second_id = store.insert_entry(second).unwrap();

        (reg, vec![chapter_id, section_id, first_id, second_id])
    }

    pub fn rejects_duplicate_titles(store: &dyn Store) {
        store.insert_regulation(regulation("民法")).unwrap();
        let error = store.insert_regulation(regulation("民法")).unwrap_err();
        assert!(matches!(error, StoreError::DuplicateTitle(title) if title == "民法"));
    }

    pub fn finds_regulations_by_title(store: &dyn Store) {
        let id = store.insert_regulation(regulation("公司法")).unwrap();
        store.insert_regulation(regulation("民法")).unwrap();

        let found = store.find_regulation("公司法").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.meta_data, "公司法\n修正日期：民國 110 年");
        assert!(store.find_regulation("刑法").unwrap().is_none());

        let titles: Vec<_> = store.titles().unwrap().into_iter().collect();
        assert_eq!(titles, vec!["公司法", "民法"]);
    }

    pub fn lists_entries_in_document_order(store: &dyn Store) {
        let (reg, ids) = seed(store);
        let other = store.insert_regulation(regulation("公司法")).unwrap();
        store
            .insert_entry(entry(other, None, 1, "第一章", "第一章 總則"))
            .unwrap();

        let listed: Vec<_> = store
            .entries(reg)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(listed, ids);
    }

    pub fn rejects_unknown_parent(store: &dyn Store) {
        let reg = store.insert_regulation(regulation("民法")).unwrap();
        let mut orphan = entry(reg, None, 2, "第一節", "第一節 通則");
        let missing = EntryId::new();
        orphan.parent_id = Some(missing);
        let error = store.insert_entry(orphan).unwrap_err();
        assert!(matches!(error, StoreError::MissingParent(id) if id == missing));
    }

    pub fn rejects_unknown_regulation(store: &dyn Store) {
        let missing = RegulationId::new();
        let error = store
            .insert_entry(entry(missing, None, 1, "第一章", "第一章 總則"))
            .unwrap_err();
        assert!(matches!(error, StoreError::MissingRegulation(id) if id == missing));
    }

    pub fn builds_depth_tagged_lineage(store: &dyn Store) {
        let (_, ids) = seed(store);

        let lineage = store.lineage(ids[2]).unwrap();
        assert_eq!(lineage.entry.id, ids[2]);
        let mut ancestors: Vec<_> = lineage
            .ancestors
            .iter()
            .map(|tagged| (tagged.depth, tagged.entry.id))
            .collect();
        ancestors.sort_unstable();
        assert_eq!(ancestors, vec![(0, ids[1]), (1, ids[0])]);
        assert!(lineage.descendants.is_empty());

        let lineage = store.lineage(ids[0]).unwrap();
        assert!(lineage.ancestors.is_empty());
        let mut descendants: Vec<_> = lineage
            .descendants
            .iter()
            .map(|tagged| (tagged.depth, tagged.entry.id))
            .collect();
        descendants.sort_unstable();
        let mut expected = vec![(0, ids[1]), (1, ids[2]), (1, ids[3])];
        expected.sort_unstable();
        assert_eq!(descendants, expected);
        assert_eq!(lineage.joined_unit_numbers(), "第一章");
    }

    pub fn unknown_lineage_root_is_an_error(store: &dyn Store) {
        seed(store);
        let missing = EntryId::new();
        let error = store.lineage(missing).unwrap_err();
        assert!(matches!(
            error,
            StoreError::RootCount { id, found: 0 } if id == missing
        ));
    }

    pub fn searches_content(store: &dyn Store) {
        let (reg, ids) = seed(store);
        let other = store.insert_regulation(regulation("公司法")).unwrap();
        let other_id = store
            .insert_entry(entry(other, None, 1, "第一章", "第一章 總則：習慣"))
            .unwrap();

        let query = SearchQuery::new("習慣", false).unwrap();
        let found: Vec<_> = store.search(&query).unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(found.len(), 3);
        assert!(found.contains(&other_id));

        let scoped: Vec<_> = store
            .search(&query.within(reg))
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(scoped, vec![ids[2], ids[3]]);
    }

    pub fn search_is_case_insensitive_on_request(store: &dyn Store) {
        let reg = store.insert_regulation(regulation("Rules")).unwrap();
        store
            .insert_entry(entry(reg, None, 1, "I.", "I. General Provisions"))
            .unwrap();

        let strict = SearchQuery::new("general", false).unwrap();
        assert!(store.search(&strict).unwrap().is_empty());
        let relaxed = SearchQuery::new("general", true).unwrap();
        assert_eq!(store.search(&relaxed).unwrap().len(), 1);
    }
}

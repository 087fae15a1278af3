//! An in-memory store backed by a directed graph.
//!
//! Useful for tests and for one-off runs that do not need a database.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, VecDeque},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use petgraph::{graphmap::DiGraphMap, Direction};

use super::{SearchQuery, Store, StoreError};
use crate::domain::{
    Entry, EntryId, Lineage, NewEntry, NewRegulation, Regulation, RegulationId, Tagged,
};

/// A [`Store`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    regulations: HashMap<RegulationId, Regulation>,

    /// Title lookup. `BTreeMap` so titles come out sorted.
    titles: BTreeMap<String, RegulationId>,

    entries: HashMap<EntryId, Entry>,

    /// Entry ids in insertion order, which is document order per regulation.
    order: Vec<EntryId>,

    /// Parent relationships. Edges point from child to parent.
    graph: DiGraphMap<EntryId, ()>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Inner {
    fn ancestors(&self, id: EntryId) -> Vec<Tagged> {
        let mut ancestors = Vec::new();
        let mut current = id;
        let mut depth = 0;
        while let Some(parent) = self
            .graph
            .neighbors_directed(current, Direction::Outgoing)
            .next()
        {
            if let Some(entry) = self.entries.get(&parent) {
                ancestors.push(Tagged {
                    depth,
                    entry: entry.clone(),
                });
            }
            current = parent;
            depth += 1;
        }
        ancestors
    }

    fn descendants(&self, id: EntryId) -> Vec<Tagged> {
        let mut descendants = Vec::new();
        let mut queue: VecDeque<(EntryId, usize)> = self
            .graph
            .neighbors_directed(id, Direction::Incoming)
            .map(|child| (child, 0))
            .collect();

        while let Some((child, depth)) = queue.pop_front() {
            queue.extend(
                self.graph
                    .neighbors_directed(child, Direction::Incoming)
                    .map(|grandchild| (grandchild, depth + 1)),
            );
            if let Some(entry) = self.entries.get(&child) {
                descendants.push(Tagged {
                    depth,
                    entry: entry.clone(),
                });
            }
        }
        descendants
    }

    fn in_order(&self) -> impl Iterator<Item = &Entry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }
}

impl Store for MemoryStore {
    fn insert_regulation(&self, regulation: NewRegulation) -> Result<RegulationId, StoreError> {
        let mut inner = self.write()?;
        if inner.titles.contains_key(&regulation.title) {
            return Err(StoreError::DuplicateTitle(regulation.title));
        }

        let id = RegulationId::new();
        inner.titles.insert(regulation.title.clone(), id);
        inner
            .regulations
            .insert(id, regulation.into_regulation(id));
        Ok(id)
    }

    fn insert_entry(&self, entry: NewEntry) -> Result<EntryId, StoreError> {
        let mut inner = self.write()?;
        if !inner.regulations.contains_key(&entry.regulation_id) {
            return Err(StoreError::MissingRegulation(entry.regulation_id));
        }
        if let Some(parent) = entry.parent_id {
            if !inner.entries.contains_key(&parent) {
                return Err(StoreError::MissingParent(parent));
            }
        }

        let id = EntryId::new();
        inner.graph.add_node(id);
        if let Some(parent) = entry.parent_id {
            inner.graph.add_edge(id, parent, ());
        }
        inner.order.push(id);
        inner.entries.insert(id, entry.into_entry(id));
        Ok(id)
    }

    fn find_regulation(&self, title: &str) -> Result<Option<Regulation>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .titles
            .get(title)
            .and_then(|id| inner.regulations.get(id))
            .cloned())
    }

    fn titles(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.read()?.titles.keys().cloned().collect())
    }

    fn entries(&self, regulation: RegulationId) -> Result<Vec<Entry>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .in_order()
            .filter(|entry| entry.regulation_id == regulation)
            .cloned()
            .collect())
    }

    fn lineage(&self, id: EntryId) -> Result<Lineage, StoreError> {
        let inner = self.read()?;
        let entry = inner
            .entries
            .get(&id)
            .cloned()
            .ok_or(StoreError::RootCount { id, found: 0 })?;

        Ok(Lineage {
            entry,
            ancestors: inner.ancestors(id),
            descendants: inner.descendants(id),
        })
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<Entry>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .in_order()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect())
    }
}

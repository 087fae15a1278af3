use tracing::debug;

use crate::{
    domain::{Classifier, EntryId, HierarchyPath, NewEntry, RegulationId},
    outline::Block,
    storage::{Store, StoreError},
};

/// An entry that can still receive children.
#[derive(Debug, Clone)]
struct Open {
    id: EntryId,
    level: u32,
    path: HierarchyPath,
}

/// Turns a sequence of blocks into parent-linked entries.
///
/// The builder keeps the chain of open entries from the root down to the most
/// recent block. A new block closes every open entry at its own level or
/// deeper and becomes a child of whatever remains on top.
#[derive(Debug)]
pub struct TreeBuilder<'s, S: ?Sized> {
    store: &'s S,
    regulation: RegulationId,
    stack: Vec<Open>,
    inserted: usize,
}

impl<'s, S: Store + ?Sized> TreeBuilder<'s, S> {
    /// Starts a tree for `regulation`.
    #[must_use]
    pub const fn new(store: &'s S, regulation: RegulationId) -> Self {
        Self {
            store,
            regulation,
            stack: Vec::new(),
            inserted: 0,
        }
    }

    /// Stores a block as the next entry and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the entry.
    pub fn push(&mut self, block: Block, unit_number: Option<&str>) -> Result<EntryId, StoreError> {
        while self.stack.last().is_some_and(|open| open.level >= block.level) {
            self.stack.pop();
        }

        let parent = self.stack.last();
        let hierarchy_path = parent
            .map_or_else(HierarchyPath::default, |open| open.path.clone())
            .child(unit_number);

        let entry = NewEntry {
            regulation_id: self.regulation,
            parent_id: parent.map(|open| open.id),
            level: block.level,
            unit_number: unit_number.map(str::to_string),
            content: block.content,
            hierarchy_path,
        };
        let path = entry.hierarchy_path.clone();
        let id = self.store.insert_entry(entry)?;
        debug!("Stored entry {id} at level {} under {path:?}", block.level);

        self.stack.push(Open {
            id,
            level: block.level,
            path,
        });
        self.inserted += 1;
        Ok(id)
    }

    /// The number of entries stored so far.
    #[must_use]
    pub fn finish(self) -> usize {
        self.inserted
    }
}

/// Stores every block of a document and returns the number of entries.
///
/// Unit numbers are the classifier's token for each block's heading.
///
/// # Errors
///
/// Returns an error if the store rejects an entry. Entries stored before the
/// failure are kept.
pub fn build_tree<S: Store + ?Sized>(
    store: &S,
    regulation: RegulationId,
    blocks: Vec<Block>,
    classifier: &Classifier<'_>,
) -> Result<usize, StoreError> {
    let mut builder = TreeBuilder::new(store, regulation);
    for block in blocks {
        let unit_number = classifier
            .classify(&block.heading)
            .map(|found| found.token.to_string());
        builder.push(block, unit_number.as_deref())?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Entry, HierarchyType, NewRegulation, PatternTable},
        outline::segment,
        storage::MemoryStore,
    };

    fn block(level: u32, text: &str) -> Block {
        Block {
            level,
            heading: text.to_string(),
            content: text.to_string(),
        }
    }

    fn stored(store: &MemoryStore) -> Vec<Entry> {
        let titles = store.titles().unwrap();
        let title = titles.first().unwrap();
        let regulation = store.find_regulation(title).unwrap().unwrap();
        store.entries(regulation.id).unwrap()
    }

    fn regulation(store: &MemoryStore) -> RegulationId {
        store
            .insert_regulation(NewRegulation::from_source(
                "民法".to_string(),
                String::new(),
                "修正日期：",
            ))
            .unwrap()
    }

    #[test]
    fn nests_by_level() {
        let store = MemoryStore::new();
        let reg = regulation(&store);
        let table = PatternTable::builtin();
        let classifier = Classifier::new(&table, Some(HierarchyType::Type1), "民法");

        let blocks = segment("# 第一章 總則\n## 第一節 通則\n### 第 1 條 本法依憲法制定之。\n");
        let count = build_tree(&store, reg, blocks, &classifier).unwrap();
        assert_eq!(count, 3);

        let entries = stored(&store);
        let levels: Vec<_> = entries.iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![1, 2, 3]);
        assert_eq!(entries[0].parent_id, None);
        assert_eq!(entries[1].parent_id, Some(entries[0].id));
        assert_eq!(entries[2].parent_id, Some(entries[1].id));
        assert_eq!(
            entries[2].hierarchy_path.levels,
            vec!["第一章", "第一節", "第 1 條"]
        );
        assert_eq!(entries[2].unit_number.as_deref(), Some("第 1 條"));
    }

    #[test]
    fn siblings_share_a_parent() {
        let store = MemoryStore::new();
        let reg = regulation(&store);
        let mut builder = TreeBuilder::new(&store, reg);

        let section = builder.push(block(2, "第一節 通則"), Some("第一節")).unwrap();
        let first = builder.push(block(3, "第 1 條 甲"), Some("第 1 條")).unwrap();
        let second = builder.push(block(3, "第 2 條 乙"), Some("第 2 條")).unwrap();
        assert_eq!(builder.finish(), 3);

        let entries = stored(&store);
        assert_eq!(entries[1].id, first);
        assert_eq!(entries[1].parent_id, Some(section));
        assert_eq!(entries[2].id, second);
        assert_eq!(entries[2].parent_id, Some(section));
        assert_eq!(entries[2].hierarchy_path.levels, vec!["第一節", "第 2 條"]);
    }

    #[test]
    fn shallower_block_closes_deeper_ones() {
        let store = MemoryStore::new();
        let reg = regulation(&store);
        let mut builder = TreeBuilder::new(&store, reg);

        let first_chapter = builder.push(block(1, "第一章"), Some("第一章")).unwrap();
        builder.push(block(2, "第一節"), Some("第一節")).unwrap();
        builder.push(block(3, "第 1 條"), Some("第 1 條")).unwrap();
        let second_chapter = builder.push(block(1, "第二章"), Some("第二章")).unwrap();
        let article = builder.push(block(3, "第 2 條"), Some("第 2 條")).unwrap();

        let lineage = store.lineage(article).unwrap();
        assert_eq!(lineage.entry.parent_id, Some(second_chapter));
        assert_eq!(lineage.entry.hierarchy_path.levels, vec!["第二章", "第 2 條"]);
        assert!(store.lineage(second_chapter).unwrap().entry.parent_id.is_none());
        assert_eq!(store.lineage(first_chapter).unwrap().descendants.len(), 2);
    }

    #[test]
    fn entries_without_unit_number_keep_parent_path() {
        let store = MemoryStore::new();
        let reg = regulation(&store);
        let mut builder = TreeBuilder::new(&store, reg);

        builder.push(block(1, "第一章"), Some("第一章")).unwrap();
        builder.push(block(2, "附表"), None).unwrap();

        let entries = stored(&store);
        assert_eq!(entries[1].unit_number, None);
        assert_eq!(entries[1].hierarchy_path, entries[0].hierarchy_path);
    }

    #[test]
    fn level_zero_blocks_stay_flat() {
        let store = MemoryStore::new();
        let reg = regulation(&store);
        let table = PatternTable::builtin();
        let classifier = Classifier::new(&table, None, "作業要點");

        let blocks = segment("作業要點\n一般規定\n附件\n");
        build_tree(&store, reg, blocks, &classifier).unwrap();

        let entries = stored(&store);
        assert_eq!(entries.len(), 3);
        assert!(entries
            .iter()
            .all(|e| e.level == 0 && e.parent_id.is_none() && e.hierarchy_path.levels.is_empty()));
    }
}

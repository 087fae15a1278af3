use serde::Serialize;

use crate::domain::Entry;

/// An entry tagged with its distance from the entry a lineage was built for.
///
/// A depth of `0` is the direct parent (for ancestors) or a direct child (for
/// descendants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tagged {
    /// Distance from the lineage root, minus one.
    pub depth: usize,
    /// The related entry.
    pub entry: Entry,
}

/// An entry together with its complete ancestor chain and descendant subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lineage {
    /// The entry the lineage was requested for.
    pub entry: Entry,
    /// All ancestors, in no particular order.
    pub ancestors: Vec<Tagged>,
    /// All descendants, in no particular order.
    pub descendants: Vec<Tagged>,
}

impl Lineage {
    /// Ancestors ordered from the root down to the direct parent.
    #[must_use]
    pub fn ancestors_root_first(&self) -> Vec<&Entry> {
        let mut ancestors: Vec<_> = self.ancestors.iter().collect();
        ancestors.sort_by(|a, b| b.depth.cmp(&a.depth));
        ancestors.into_iter().map(|tagged| &tagged.entry).collect()
    }

    /// Concatenates the content of every ancestor and the entry itself.
    ///
    /// Contents are joined root first, each separated by a newline.
    #[must_use]
    pub fn joined_content(&self) -> String {
        let mut joined: String = self
            .ancestors_root_first()
            .into_iter()
            .map(|ancestor| format!("{}\n", ancestor.content))
            .collect();
        joined.push_str(&self.entry.content);
        joined
    }

    /// Concatenates the unit numbers of every ancestor and the entry itself.
    ///
    /// Unit numbers are joined root first with `", "`. Entries without a unit
    /// number are left out.
    #[must_use]
    pub fn joined_unit_numbers(&self) -> String {
        self.ancestors_root_first()
            .into_iter()
            .chain(std::iter::once(&self.entry))
            .filter_map(|entry| entry.unit_number.as_deref())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Descendants ordered by depth, shallowest first.
    #[must_use]
    pub fn descendants_by_depth(&self) -> Vec<&Tagged> {
        let mut descendants: Vec<_> = self.descendants.iter().collect();
        descendants.sort_by_key(|tagged| tagged.depth);
        descendants
    }
}

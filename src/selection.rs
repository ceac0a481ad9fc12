//! The ordered, user-curated queue of items and its selected subset.

use std::collections::HashSet;

use crate::item::{CatalogId, Item};

/// Ordered collection of queued items.
///
/// Collection order is download order. The "selected" subset is tracked by
/// identity and is what a run consumes; unselected entries are never
/// downloaded.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    items: Vec<Item>,
    selected: HashSet<CatalogId>,
}

impl SelectionSet {
    /// Creates an empty selection set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item to the end of the collection.
    pub fn add(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Appends items in order.
    pub fn extend(&mut self, items: impl IntoIterator<Item = Item>) {
        self.items.extend(items);
    }

    /// Removes every occurrence of the given identities. Survivors keep their
    /// relative order; absent identities are ignored.
    ///
    /// Returns the number of entries removed.
    pub fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a CatalogId>) -> usize {
        let ids: HashSet<&CatalogId> = ids.into_iter().collect();
        if ids.is_empty() {
            return 0;
        }
        let before = self.items.len();
        self.items.retain(|item| !ids.contains(item.id()));
        self.selected.retain(|id| !ids.contains(id));
        before - self.items.len()
    }

    /// Removes every selected entry from the collection.
    pub fn remove_selected(&mut self) -> usize {
        let selected = std::mem::take(&mut self.selected);
        let before = self.items.len();
        self.items.retain(|item| !selected.contains(item.id()));
        before - self.items.len()
    }

    /// Marks an item as selected. Returns `false` if no such item is queued.
    pub fn select(&mut self, id: &CatalogId) -> bool {
        if self.contains(id) {
            self.selected.insert(id.clone());
            true
        } else {
            false
        }
    }

    /// Unmarks an item. Returns whether it was selected.
    pub fn deselect(&mut self, id: &CatalogId) -> bool {
        self.selected.remove(id)
    }

    pub fn select_all(&mut self) {
        self.selected = self.items.iter().map(|item| item.id().clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// First selected item in collection order.
    #[must_use]
    pub fn head(&self) -> Option<&Item> {
        self.items
            .iter()
            .find(|item| self.selected.contains(item.id()))
    }

    /// Selected items in collection order.
    pub fn selected(&self) -> impl Iterator<Item = &Item> {
        self.items
            .iter()
            .filter(|item| self.selected.contains(item.id()))
    }

    /// Number of selected entries, counting duplicates.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.selected().count()
    }

    #[must_use]
    pub fn is_selected(&self, id: &CatalogId) -> bool {
        self.selected.contains(id)
    }

    #[must_use]
    pub fn contains(&self, id: &CatalogId) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::TrackHandle;

    fn item(id: &str) -> Item {
        Item::new(CatalogId::new(id), id.to_uppercase(), TrackHandle::new(id))
    }

    fn ids(set: &SelectionSet) -> Vec<&str> {
        set.items().iter().map(|i| i.id().as_str()).collect()
    }

    fn set_of(names: &[&str]) -> SelectionSet {
        let mut set = SelectionSet::new();
        set.extend(names.iter().map(|n| item(n)));
        set
    }

    #[test]
    fn add_appends_in_order() {
        let mut set = SelectionSet::new();
        set.add(item("a"));
        set.add(item("b"));
        set.extend([item("c"), item("d")]);
        assert_eq!(ids(&set), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn head_is_first_selected_not_first_item() {
        let mut set = set_of(&["a", "b", "c"]);
        assert!(set.head().is_none());

        set.select(&CatalogId::new("c"));
        set.select(&CatalogId::new("b"));
        assert_eq!(set.head().map(|i| i.id().as_str()), Some("b"));
        assert_eq!(set.selected_count(), 2);
    }

    #[test]
    fn select_unknown_item_is_refused() {
        let mut set = set_of(&["a"]);
        assert!(!set.select(&CatalogId::new("zzz")));
        assert_eq!(set.selected_count(), 0);
    }

    #[test]
    fn remove_all_preserves_survivor_order() {
        let mut set = set_of(&["a", "b", "c", "d"]);
        set.select_all();
        let removed = set.remove_all([&CatalogId::new("b"), &CatalogId::new("d")]);
        assert_eq!(removed, 2);
        assert_eq!(ids(&set), vec!["a", "c"]);
        assert_eq!(set.selected_count(), 2);
    }

    #[test]
    fn remove_all_removes_duplicates() {
        let mut set = set_of(&["a", "b", "a"]);
        assert_eq!(set.remove_all([&CatalogId::new("a")]), 2);
        assert_eq!(ids(&set), vec!["b"]);
    }

    #[test]
    fn removing_absent_item_is_noop() {
        let mut set = set_of(&["a", "b"]);
        set.select_all();
        assert_eq!(set.remove_all([&CatalogId::new("zzz")]), 0);
        assert_eq!(ids(&set), vec!["a", "b"]);
        assert_eq!(set.selected_count(), 2);
        assert_eq!(set.remove_all(std::iter::empty()), 0);
    }

    #[test]
    fn removed_then_readded_item_is_not_selected() {
        let mut set = set_of(&["a"]);
        set.select_all();
        set.remove_all([&CatalogId::new("a")]);
        set.add(item("a"));
        assert!(!set.is_selected(&CatalogId::new("a")));
        assert!(set.head().is_none());
    }

    #[test]
    fn remove_selected_keeps_unselected() {
        let mut set = set_of(&["a", "b", "c"]);
        set.select(&CatalogId::new("a"));
        set.select(&CatalogId::new("c"));
        assert_eq!(set.remove_selected(), 2);
        assert_eq!(ids(&set), vec!["b"]);
        assert_eq!(set.selected_count(), 0);
    }

    #[test]
    fn select_all_then_clear() {
        let mut set = set_of(&["a", "b"]);
        set.select_all();
        assert_eq!(set.selected_count(), 2);
        set.clear_selection();
        assert_eq!(set.selected_count(), 0);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn deselect_reports_previous_state() {
        let mut set = set_of(&["a"]);
        set.select_all();
        assert!(set.deselect(&CatalogId::new("a")));
        assert!(!set.deselect(&CatalogId::new("a")));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn remove_all_keeps_relative_order(
                names in proptest::collection::vec("[a-e]", 0..20),
                doomed in proptest::collection::vec("[a-e]", 0..3),
            ) {
                let mut set = SelectionSet::new();
                set.extend(names.iter().map(|n| item(n)));
                let doomed_ids: Vec<CatalogId> = doomed.iter().map(CatalogId::new).collect();
                set.remove_all(doomed_ids.iter());

                let expected: Vec<&str> = names
                    .iter()
                    .map(String::as_str)
                    .filter(|n| !doomed.iter().any(|d| d == n))
                    .collect();
                prop_assert_eq!(ids(&set), expected);
            }

            #[test]
            fn head_is_always_selected(
                names in proptest::collection::vec("[a-e]", 1..20),
                pick in "[a-e]",
            ) {
                let mut set = SelectionSet::new();
                set.extend(names.iter().map(|n| item(n)));
                set.select(&CatalogId::new(pick.clone()));
                match set.head() {
                    Some(head) => prop_assert_eq!(head.id().as_str(), pick.as_str()),
                    None => prop_assert!(!names.contains(&pick)),
                }
            }
        }
    }
}

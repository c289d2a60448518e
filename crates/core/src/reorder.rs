//! Drag-to-reorder sessions.
//!
//! A session snapshots a collection when reordering starts. Moves are applied
//! to the live collection so the UI can render them, but nothing is persisted
//! until the session is committed; cancelling puts the snapshot back.

use crate::item::Item;

#[derive(Debug, Clone)]
pub struct ReorderSession {
    snapshot: Vec<Item>,
}

impl ReorderSession {
    /// Start a session over the current order
    pub fn begin(items: &[Item]) -> Self {
        Self {
            snapshot: items.to_vec(),
        }
    }

    /// Order at the time the session started
    pub fn snapshot(&self) -> &[Item] {
        &self.snapshot
    }

    /// Replace the order a cancel would restore
    pub fn rebase(&mut self, items: Vec<Item>) {
        self.snapshot = items;
    }

    /// Restore the snapshot into `items`, discarding every move
    pub fn restore(self, items: &mut Vec<Item>) {
        *items = self.snapshot;
    }
}

/// Move the item at `from` so it ends up at `to`, shifting the items in between.
///
/// Returns false and leaves `items` untouched when either index is out of range.
pub fn move_item(items: &mut Vec<Item>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apps(names: &[&str]) -> Vec<Item> {
        names.iter().map(|n| Item::application(*n)).collect()
    }

    fn targets(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.target.as_str()).collect()
    }

    #[test]
    fn test_move_forward_and_back() {
        let mut items = apps(&["a", "b", "c", "d"]);

        assert!(move_item(&mut items, 0, 2));
        assert_eq!(targets(&items), ["b", "c", "a", "d"]);

        assert!(move_item(&mut items, 3, 0));
        assert_eq!(targets(&items), ["d", "b", "c", "a"]);
    }

    #[test]
    fn test_stale_index_is_ignored() {
        let mut items = apps(&["a", "b"]);
        assert!(!move_item(&mut items, 0, 2));
        assert!(!move_item(&mut items, 5, 0));
        assert_eq!(targets(&items), ["a", "b"]);
    }

    #[test]
    fn test_restore_discards_moves() {
        let mut items = apps(&["a", "b", "c"]);
        let session = ReorderSession::begin(&items);

        move_item(&mut items, 0, 2);
        move_item(&mut items, 1, 0);
        move_item(&mut items, 2, 1);

        session.restore(&mut items);
        assert_eq!(targets(&items), ["a", "b", "c"]);
    }
}

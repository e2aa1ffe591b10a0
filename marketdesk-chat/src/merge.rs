//! Order-preserving merge of a message batch into the displayed list.

use crate::entry::ChatEntry;

/// Where a batch is inserted before re-sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Older history, inserted ahead of the current list.
    Front,
    /// Live or local messages, inserted behind the current list.
    Back,
}

/// Merge `batch` into `current` and sort ascending by `updated_at`.
///
/// The sort is stable, so entries with equal timestamps keep their
/// insertion order: batch first for [`Placement::Front`], current first for
/// [`Placement::Back`].
#[must_use]
pub fn merge(current: Vec<ChatEntry>, batch: Vec<ChatEntry>, placement: Placement) -> Vec<ChatEntry> {
    let mut merged = Vec::with_capacity(current.len() + batch.len());
    match placement {
        Placement::Front => {
            merged.extend(batch);
            merged.extend(current);
        }
        Placement::Back => {
            merged.extend(current);
            merged.extend(batch);
        }
    }
    merged.sort_by_key(ChatEntry::updated_at);
    merged
}

/// Whether `entries` is sorted non-decreasing by `updated_at`.
#[must_use]
pub fn is_chronological(entries: &[ChatEntry]) -> bool {
    entries
        .windows(2)
        .all(|pair| pair[0].updated_at() <= pair[1].updated_at())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Message, UserId};

    fn entry(body: &str, updated_at: i64) -> ChatEntry {
        ChatEntry::confirmed(Message {
            sender_id: UserId::from("a"),
            receiver_id: UserId::from("b"),
            body: body.to_string(),
            created_at: updated_at,
            updated_at,
        })
    }

    fn stamps(entries: &[ChatEntry]) -> Vec<i64> {
        entries.iter().map(ChatEntry::updated_at).collect()
    }

    #[test]
    fn sorts_out_of_order_backend_page() {
        let page = [5, 3, 1, 4, 2].iter().map(|t| entry("m", *t)).collect();
        let merged = merge(Vec::new(), page, Placement::Front);
        assert_eq!(stamps(&merged), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn older_batch_lands_in_front() {
        let current = vec![entry("c1", 10), entry("c2", 11)];
        let older = vec![entry("o2", 8), entry("o1", 7)];
        let merged = merge(current, older, Placement::Front);
        assert_eq!(stamps(&merged), vec![7, 8, 10, 11]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let current = vec![entry("first", 5)];
        let appended = merge(current.clone(), vec![entry("second", 5)], Placement::Back);
        assert_eq!(appended[0].message.body, "first");
        assert_eq!(appended[1].message.body, "second");

        let prepended = merge(current, vec![entry("older", 5)], Placement::Front);
        assert_eq!(prepended[0].message.body, "older");
    }

    #[test]
    fn late_live_message_is_placed_by_timestamp() {
        let current = vec![entry("a", 1), entry("c", 3)];
        let merged = merge(current, vec![entry("b", 2)], Placement::Back);
        assert_eq!(stamps(&merged), vec![1, 2, 3]);
        assert!(is_chronological(&merged));
    }

    #[test]
    fn chronological_check() {
        assert!(is_chronological(&[]));
        assert!(is_chronological(&[entry("x", 1), entry("y", 1)]));
        assert!(!is_chronological(&[entry("x", 2), entry("y", 1)]));
    }
}

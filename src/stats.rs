//! Engagement counters recovered from the unlabeled stats row of a card.
//!
//! The row renders as a flat run of sibling nodes, `"12" "阅读" "3" "赞同" ...`:
//! a number followed by the label it belongs to. Pairing happens in a single
//! pass. Fragments that break the number-then-label rhythm are dropped.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Stats {
    pub reads: u32,
    pub upvotes: u32,
    pub comments: u32,
    pub bookmarks: u32,
    pub likes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    Reads,
    Upvotes,
    Comments,
    Bookmarks,
    Likes,
}

impl Counter {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "阅读" => Some(Self::Reads),
            "赞同" => Some(Self::Upvotes),
            "评论" => Some(Self::Comments),
            "收藏" => Some(Self::Bookmarks),
            "喜欢" => Some(Self::Likes),
            _ => None,
        }
    }
}

impl Stats {
    fn set(&mut self, counter: Counter, value: u32) {
        match counter {
            Counter::Reads => self.reads = value,
            Counter::Upvotes => self.upvotes = value,
            Counter::Comments => self.comments = value,
            Counter::Bookmarks => self.bookmarks = value,
            Counter::Likes => self.likes = value,
        }
    }
}

/// Rebuilds [`Stats`] from the trimmed text fragments of a stats row.
///
/// A number is held until the next label. A recognized label takes the held
/// number (zero if none) and clears it; an unknown label is ignored and keeps
/// it. A number that gets overwritten or is never claimed is lost.
pub fn parse_stats<S: AsRef<str>>(fragments: &[S]) -> Stats {
    let mut stats = Stats::default();
    let mut pending: Option<u32> = None;

    for fragment in fragments {
        let fragment = fragment.as_ref().trim();

        if let Ok(number) = fragment.parse::<u32>() {
            if let Some(lost) = pending.replace(number) {
                tracing::debug!(lost, replaced_by = number, "stats number without label");
            }
            continue;
        }

        if let Some(counter) = Counter::from_label(fragment) {
            stats.set(counter, pending.take().unwrap_or(0));
        }
    }

    if let Some(lost) = pending {
        tracing::debug!(lost, "trailing stats number without label");
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_numbers_with_labels() {
        let stats = parse_stats(&["12", "阅读", "3", "赞同"]);
        assert_eq!(
            stats,
            Stats { reads: 12, upvotes: 3, comments: 0, bookmarks: 0, likes: 0 }
        );
    }

    #[test]
    fn test_all_five_labels() {
        let stats = parse_stats(&["1", "阅读", "2", "赞同", "3", "评论", "4", "收藏", "5", "喜欢"]);
        assert_eq!(
            stats,
            Stats { reads: 1, upvotes: 2, comments: 3, bookmarks: 4, likes: 5 }
        );
    }

    #[test]
    fn test_fragments_are_trimmed() {
        let stats = parse_stats(&[" 7 ", "\n评论 "]);
        assert_eq!(stats.comments, 7);
    }

    #[test]
    fn test_second_number_overwrites_first() {
        let stats = parse_stats(&["5", "9", "阅读"]);
        assert_eq!(stats.reads, 9);
    }

    #[test]
    fn test_label_without_number_assigns_zero() {
        let stats = parse_stats(&["8", "阅读", "赞同"]);
        assert_eq!(stats.reads, 8);
        assert_eq!(stats.upvotes, 0);
    }

    #[test]
    fn test_unknown_label_keeps_pending_number() {
        let stats = parse_stats(&["4", "次", "收藏"]);
        assert_eq!(stats.bookmarks, 4);
    }

    #[test]
    fn test_trailing_number_is_dropped() {
        let stats = parse_stats(&["3", "喜欢", "42"]);
        assert_eq!(stats, Stats { likes: 3, ..Stats::default() });
    }

    #[test]
    fn test_negative_and_decimal_are_not_numbers() {
        let stats = parse_stats(&["-3", "阅读", "1.5", "赞同"]);
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn test_empty_input() {
        let empty: [&str; 0] = [];
        assert_eq!(parse_stats(&empty), Stats::default());
    }
}

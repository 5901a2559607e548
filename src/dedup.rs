use std::collections::HashSet;

/// Links already emitted during one crawl. First occurrence wins.
#[derive(Debug, Default)]
pub struct SeenLinks {
    links: HashSet<String>,
}

impl SeenLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    pub fn mark_seen(&mut self, link: impl Into<String>) {
        self.links.insert(link.into());
    }

    /// Marks `link` and reports whether it was new.
    pub fn insert(&mut self, link: &str) -> bool {
        if self.seen(link) {
            return false;
        }
        self.mark_seen(link);
        true
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_occurrence_wins() {
        let mut seen = SeenLinks::new();
        assert!(!seen.seen("/p/1"));
        assert!(seen.insert("/p/1"));
        assert!(seen.seen("/p/1"));
        assert!(!seen.insert("/p/1"));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_mark_seen() {
        let mut seen = SeenLinks::new();
        assert!(seen.is_empty());
        seen.mark_seen(String::from("/p/2"));
        assert!(seen.seen("/p/2"));
        assert!(!seen.seen("/p/3"));
    }
}

#![forbid(unsafe_code)]

//! Ordered image preloading.
//!
//! Lists are fetched one at a time: list `i + 1` is only requested once list
//! `i` has fully loaded, so the first set a visitor sees is never starved by
//! later ones. Each list is reported complete exactly once, in order.

use std::collections::HashSet;

/// Result of a preloader step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadStep {
    /// Lists that became complete, in order.
    pub completed: Vec<usize>,
    /// URLs the host should start loading now.
    pub requests: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SequencePreloader {
    lists: Vec<Vec<String>>,
    next: usize,
    requested: HashSet<String>,
    loaded: HashSet<String>,
}

impl SequencePreloader {
    #[must_use]
    pub fn new(lists: Vec<Vec<String>>) -> Self {
        Self {
            lists,
            next: 0,
            requested: HashSet::new(),
            loaded: HashSet::new(),
        }
    }

    /// Kick off loading; empty leading lists complete immediately.
    pub fn start(&mut self) -> PreloadStep {
        self.advance()
    }

    /// Record `url` as loaded. Unknown or repeated URLs are harmless.
    pub fn on_loaded(&mut self, url: &str) -> PreloadStep {
        if !self.requested.contains(url) {
            tracing::debug!(url, "preload of unrequested url ignored");
            return PreloadStep::default();
        }
        self.loaded.insert(url.to_owned());
        self.advance()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.next >= self.lists.len()
    }

    /// Number of lists reported complete so far.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.next
    }

    fn advance(&mut self) -> PreloadStep {
        let mut step = PreloadStep::default();
        while let Some(list) = self.lists.get(self.next) {
            for url in list {
                if self.requested.insert(url.clone()) {
                    step.requests.push(url.clone());
                }
            }
            if !list.iter().all(|url| self.loaded.contains(url)) {
                break;
            }
            step.completed.push(self.next);
            self.next += 1;
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lists(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|l| l.iter().map(|s| (*s).to_owned()).collect())
            .collect()
    }

    #[test]
    fn requests_one_list_at_a_time() {
        let mut p = SequencePreloader::new(lists(&[&["a", "b"], &["c"]]));
        assert_eq!(p.start().requests, vec!["a", "b"]);
        assert_eq!(p.on_loaded("b"), PreloadStep::default());
        assert_eq!(
            p.on_loaded("a"),
            PreloadStep {
                completed: vec![0],
                requests: vec!["c".to_owned()]
            }
        );
        assert_eq!(p.on_loaded("c").completed, vec![1]);
        assert!(p.is_done());
    }

    #[test]
    fn shared_urls_are_fetched_once() {
        let mut p = SequencePreloader::new(lists(&[&["a"], &["a"], &["a", "b"]]));
        p.start();
        let step = p.on_loaded("a");
        assert_eq!(step.completed, vec![0, 1]);
        assert_eq!(step.requests, vec!["b"]);
    }

    #[test]
    fn empty_lists_complete_immediately() {
        let mut p = SequencePreloader::new(lists(&[&[], &["x"], &[]]));
        let step = p.start();
        assert_eq!(step.completed, vec![0]);
        assert_eq!(p.on_loaded("x").completed, vec![1, 2]);
    }

    #[test]
    fn duplicate_and_unknown_loads_are_ignored() {
        let mut p = SequencePreloader::new(lists(&[&["a"], &["b"]]));
        p.start();
        assert_eq!(p.on_loaded("b"), PreloadStep::default());
        assert_eq!(p.on_loaded("a").completed, vec![0]);
        assert_eq!(p.on_loaded("a"), PreloadStep::default());
        assert_eq!(p.completed(), 1);
    }
}

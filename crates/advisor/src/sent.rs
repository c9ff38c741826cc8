//! Session-scoped dedup list for delivered suggestions
//!
//! Bounded: the advisory loop consults and grows this for the life of one
//! session, and the session owner clears it on teardown. Nothing here is
//! global.

use std::collections::VecDeque;

use salescoach_config::constants::advisory::SENT_LIST_CAP;

/// Texts already pushed down the advisory channel this session.
#[derive(Debug)]
pub struct SentSuggestions {
    texts: VecDeque<String>,
    cap: usize,
}

impl SentSuggestions {
    pub fn new() -> Self {
        Self::with_cap(SENT_LIST_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            texts: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.texts.iter().any(|t| t == text)
    }

    /// Record a delivered text, evicting the oldest past the cap.
    pub fn record(&mut self, text: impl Into<String>) {
        self.texts.push_back(text.into());
        while self.texts.len() > self.cap {
            self.texts.pop_front();
        }
    }

    /// Snapshot for the analysis request's dedup field.
    pub fn snapshot(&self) -> Vec<String> {
        self.texts.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn clear(&mut self) {
        self.texts.clear();
    }
}

impl Default for SentSuggestions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_contains() {
        let mut sent = SentSuggestions::new();
        assert!(!sent.contains("slow down"));

        sent.record("slow down");
        assert!(sent.contains("slow down"));
        assert_eq!(sent.len(), 1);
    }

    #[test]
    fn test_bounded_eviction() {
        let mut sent = SentSuggestions::with_cap(3);
        for i in 0..5 {
            sent.record(format!("tip {}", i));
        }

        assert_eq!(sent.len(), 3);
        assert!(!sent.contains("tip 0"));
        assert!(!sent.contains("tip 1"));
        assert!(sent.contains("tip 4"));
    }

    #[test]
    fn test_clear() {
        let mut sent = SentSuggestions::new();
        sent.record("tip");
        sent.clear();
        assert!(sent.is_empty());
    }
}

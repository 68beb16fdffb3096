//! Operation counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, fixed set of named counters.
///
/// Names not registered at construction are ignored by the mutators and
/// read as zero.
pub struct StatsCounter {
    counters: BTreeMap<&'static str, AtomicU64>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        let counters = names.iter().map(|&n| (n, AtomicU64::new(0))).collect();
        Self { counters }
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_registered_names() {
        let stats = StatsCounter::new(&["commits", "errors"]);
        stats.increment("commits");
        stats.add("commits", 2);
        stats.increment("unknown");
        assert_eq!(stats.get("commits"), 3);
        assert_eq!(stats.get("errors"), 0);
        assert_eq!(stats.get("unknown"), 0);
    }
}

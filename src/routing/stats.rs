//! Per-backend hit counters with pull-and-clear reads.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Concurrent hit counter keyed by backend label.
///
/// Both operations hold the lock only for a map update or a map swap,
/// so an increment lands entirely before or after a snapshot.
#[derive(Debug, Default)]
pub struct StatsCollector {
    hits: Mutex<HashMap<String, u64>>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one hit for `label`.
    pub fn increment(&self, label: &str) {
        let mut hits = self.hits.lock();
        match hits.get_mut(label) {
            Some(count) => *count += 1,
            None => {
                hits.insert(label.to_string(), 1);
            }
        }
    }

    /// Return the accumulated counts and start over from zero.
    pub fn snapshot_and_reset(&self) -> HashMap<String, u64> {
        std::mem::take(&mut *self.hits.lock())
    }

    /// Current count for `label` without resetting anything.
    pub fn peek(&self, label: &str) -> u64 {
        self.hits.lock().get(label).copied().unwrap_or(0)
    }
}

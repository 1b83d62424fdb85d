//! Age-bounded buffer of admission snapshots
//!
//! While the remote sink is unreachable the router keeps admitting people;
//! this buffer holds a snapshot of every recent admission so the exporter
//! can replay them once connectivity returns. Entries older than the
//! retention window are pruned lazily on every append.

use std::collections::VecDeque;
use std::time::Duration;

use crate::engine::person::Person;

/// Snapshots of recently admitted people, bounded by age
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<Person>,
    retention: Duration,
}

impl HistoryBuffer {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            retention,
        }
    }

    /// Append a snapshot, pruning anything stale first
    pub fn record(&mut self, person: Person, now_ms: i64) {
        self.prune(now_ms);
        self.entries.push_back(person);
    }

    /// Drop entries admitted before `now_ms - retention`
    pub fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.retention.as_millis() as i64;
        self.entries.retain(|p| p.entered_at() >= cutoff);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Person> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Forget everything, e.g. after a fully successful replay
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: u64, entered_at: i64) -> Person {
        Person::new(id, 1, 0.0, entered_at)
    }

    #[test]
    fn record_keeps_entries_within_window() {
        let mut buffer = HistoryBuffer::new(Duration::from_secs(3600));
        buffer.record(person(1, 0), 0);
        buffer.record(person(2, 1_000_000), 1_000_000);
        assert_eq!(buffer.len(), 2);

        // An hour and a bit after the first entry, only the second stays.
        buffer.record(person(3, 3_700_000), 3_700_000);
        let ids: Vec<u64> = buffer.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn prune_is_idempotent_at_the_boundary() {
        let mut buffer = HistoryBuffer::new(Duration::from_secs(60));
        buffer.record(person(1, 10_000), 10_000);

        // Exactly at the cutoff the entry is still inside the window.
        buffer.prune(70_000);
        assert_eq!(buffer.len(), 1);

        buffer.prune(70_001);
        assert!(buffer.is_empty());
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut buffer = HistoryBuffer::new(Duration::from_secs(3600));
        buffer.record(person(1, 0), 0);
        buffer.record(person(2, 5), 5);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.iter().count(), 0);
    }
}

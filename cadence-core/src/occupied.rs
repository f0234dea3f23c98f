//! The shared set of time ranges that block scheduling.
//!
//! The set only grows during a run. Entries that describe the same logical
//! thing (same kind, same source key, same range) are stored once.

use serde::{Deserialize, Serialize};

use crate::interval::{merge, Interval};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupiedKind {
    /// Existing calendar commitment.
    Commitment,
    /// Travel to or from an in-person commitment.
    Travel,
    /// Screen-free rest after a virtual commitment.
    Rest,
    /// Daily break.
    Break,
    /// A task fragment placed earlier in this run.
    Placed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupied {
    pub interval: Interval,
    pub kind: OccupiedKind,
    /// Identity of what produced the entry (event id, task id, "break:<date>").
    pub source: Option<String>,
}

impl Occupied {
    pub fn new(interval: Interval, kind: OccupiedKind, source: Option<String>) -> Self {
        Self { interval, kind, source }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupiedSet {
    entries: Vec<Occupied>,
}

impl OccupiedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Returns `false` when it was empty or already present.
    pub fn insert(&mut self, entry: Occupied) -> bool {
        if entry.interval.is_empty() || self.entries.contains(&entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = Occupied>) -> usize {
        let mut added = 0;
        for e in entries {
            if self.insert(e) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Occupied] {
        &self.entries
    }

    /// Intervals overlapping `window`, unmerged.
    pub fn overlapping(&self, window: &Interval) -> Vec<Interval> {
        self.entries
            .iter()
            .map(|e| e.interval)
            .filter(|i| i.overlaps(window))
            .collect()
    }

    pub fn is_free(&self, interval: &Interval) -> bool {
        !self.entries.iter().any(|e| e.interval.overlaps(interval))
    }

    /// Coalesced view of everything occupied.
    pub fn merged(&self) -> Vec<Interval> {
        merge(self.entries.iter().map(|e| e.interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn iv(h1: u32, h2: u32) -> Interval {
        Interval::new(
            Utc.with_ymd_and_hms(2026, 3, 2, h1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, h2, 0, 0).unwrap(),
        )
    }

    #[test]
    fn duplicates_are_stored_once() {
        let mut set = OccupiedSet::new();
        let a = Occupied::new(iv(9, 10), OccupiedKind::Commitment, Some("evt1".into()));
        assert!(set.insert(a.clone()));
        assert!(!set.insert(a));
        assert_eq!(set.len(), 1);

        // Same range from a different source is a different thing.
        assert!(set.insert(Occupied::new(iv(9, 10), OccupiedKind::Travel, Some("evt1".into()))));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn empty_intervals_are_ignored() {
        let mut set = OccupiedSet::new();
        assert!(!set.insert(Occupied::new(iv(9, 9), OccupiedKind::Break, None)));
        assert!(set.is_empty());
    }

    #[test]
    fn free_checks_and_overlap_queries() {
        let mut set = OccupiedSet::new();
        set.extend([
            Occupied::new(iv(9, 10), OccupiedKind::Commitment, None),
            Occupied::new(iv(10, 11), OccupiedKind::Placed, Some("t1".into())),
        ]);
        assert!(set.is_free(&iv(11, 12)));
        assert!(!set.is_free(&iv(8, 10)));
        assert_eq!(set.overlapping(&iv(10, 12)), vec![iv(10, 11)]);
        assert_eq!(set.merged(), vec![iv(9, 11)]);
    }
}

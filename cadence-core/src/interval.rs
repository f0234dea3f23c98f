//! Interval algebra over half-open `[start, end)` UTC ranges.
//!
//! `subtract`, `merge` and `chunk` are pure; every one of them maps empty
//! input to empty output and never produces an empty interval.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Interval of `minutes` length starting at `start`.
    pub fn from_minutes(start: DateTime<Utc>, minutes: i64) -> Self {
        Self::new(start, start + Duration::minutes(minutes))
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration(&self) -> Duration {
        if self.is_empty() {
            Duration::zero()
        } else {
            self.end - self.start
        }
    }

    pub fn minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Strict overlap; touching intervals do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Intersection, or `None` when it would be empty.
    pub fn intersect(&self, bounds: &Interval) -> Option<Interval> {
        let out = Interval::new(self.start.max(bounds.start), self.end.min(bounds.end));
        (!out.is_empty()).then_some(out)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Remove every occupied range from `window`, returning the free remainders in
/// start order. Remainders always lie inside `window`.
pub fn subtract(window: Interval, occupied: &[Interval]) -> Vec<Interval> {
    if window.is_empty() {
        return Vec::new();
    }

    let blockers = merge(occupied.iter().copied().filter(|o| o.overlaps(&window)));

    let mut out = Vec::new();
    let mut cursor = window.start;
    for b in blockers {
        if b.start > cursor {
            out.push(Interval::new(cursor, b.start.min(window.end)));
        }
        cursor = cursor.max(b.end);
        if cursor >= window.end {
            break;
        }
    }
    if cursor < window.end {
        out.push(Interval::new(cursor, window.end));
    }
    out
}

/// Sort and coalesce intervals. Adjacent intervals (`next.start == prev.end`)
/// are merged just like overlapping ones. Empty intervals are dropped.
pub fn merge(intervals: impl IntoIterator<Item = Interval>) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.into_iter().filter(|i| !i.is_empty()).collect();
    sorted.sort();

    let mut out: Vec<Interval> = Vec::with_capacity(sorted.len());
    for cur in sorted {
        match out.last_mut() {
            Some(prev) if cur.start <= prev.end => {
                prev.end = prev.end.max(cur.end);
            }
            _ => out.push(cur),
        }
    }
    out
}

/// Split `interval` into consecutive `size` pieces; the last piece is shorter
/// when the length is not a multiple of `size`. A non-positive `size` yields
/// the interval unchanged.
pub fn chunk(interval: Interval, size: Duration) -> Vec<Interval> {
    if interval.is_empty() {
        return Vec::new();
    }
    if size <= Duration::zero() {
        return vec![interval];
    }

    let mut out = Vec::new();
    let mut cursor = interval.start;
    while cursor < interval.end {
        let end = (cursor + size).min(interval.end);
        out.push(Interval::new(cursor, end));
        cursor = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn iv(h1: u32, m1: u32, h2: u32, m2: u32) -> Interval {
        Interval::new(at(h1, m1), at(h2, m2))
    }

    #[test]
    fn subtract_nothing_returns_window() {
        let w = iv(9, 0, 10, 30);
        assert_eq!(subtract(w, &[]), vec![w]);
    }

    #[test]
    fn subtract_whole_window_returns_nothing() {
        let w = iv(9, 0, 10, 30);
        assert!(subtract(w, &[w]).is_empty());
        assert!(subtract(w, &[iv(8, 0, 11, 0)]).is_empty());
    }

    #[test]
    fn subtract_outside_leaves_window() {
        let w = iv(9, 0, 10, 30);
        assert_eq!(subtract(w, &[iv(11, 0, 12, 0), iv(7, 0, 9, 0)]), vec![w]);
    }

    #[test]
    fn subtract_middle_and_edges() {
        let w = iv(9, 0, 12, 0);
        let got = subtract(w, &[iv(10, 0, 10, 30), iv(8, 30, 9, 15), iv(11, 45, 13, 0)]);
        assert_eq!(got, vec![iv(9, 15, 10, 0), iv(10, 30, 11, 45)]);
    }

    #[test]
    fn subtract_overlapping_blockers() {
        let w = iv(9, 0, 12, 0);
        let got = subtract(w, &[iv(10, 0, 11, 0), iv(9, 30, 10, 30)]);
        assert_eq!(got, vec![iv(9, 0, 9, 30), iv(11, 0, 12, 0)]);
    }

    #[test]
    fn merge_disjoint_keeps_start_order() {
        let a = iv(9, 0, 10, 0);
        let b = iv(11, 0, 12, 0);
        assert_eq!(merge([b, a]), vec![a, b]);
    }

    #[test]
    fn merge_adjacent_counts_as_overlap() {
        assert_eq!(merge([iv(9, 0, 10, 0), iv(10, 0, 11, 0)]), vec![iv(9, 0, 11, 0)]);
        assert_eq!(merge([iv(9, 0, 10, 30), iv(10, 0, 11, 0)]), vec![iv(9, 0, 11, 0)]);
        assert_eq!(merge([iv(9, 0, 12, 0), iv(10, 0, 11, 0)]), vec![iv(9, 0, 12, 0)]);
    }

    #[test]
    fn empty_inputs_give_empty_outputs() {
        assert!(merge(Vec::<Interval>::new()).is_empty());
        assert!(subtract(iv(9, 0, 9, 0), &[]).is_empty());
        assert!(chunk(iv(9, 0, 9, 0), Duration::minutes(15)).is_empty());
    }

    #[test]
    fn chunk_with_remainder() {
        let pieces = chunk(iv(9, 40, 10, 30), Duration::minutes(15));
        assert_eq!(
            pieces,
            vec![iv(9, 40, 9, 55), iv(9, 55, 10, 10), iv(10, 10, 10, 25), iv(10, 25, 10, 30)]
        );
        assert_eq!(merge(pieces), vec![iv(9, 40, 10, 30)]);
    }

    #[test]
    fn chunk_exact_multiple() {
        let pieces = chunk(iv(9, 0, 10, 0), Duration::minutes(30));
        assert_eq!(pieces, vec![iv(9, 0, 9, 30), iv(9, 30, 10, 0)]);
    }

    #[test]
    fn intersect_and_contains() {
        let w = iv(9, 0, 12, 0);
        assert_eq!(iv(8, 0, 10, 0).intersect(&w), Some(iv(9, 0, 10, 0)));
        assert_eq!(iv(12, 0, 13, 0).intersect(&w), None);
        assert!(w.contains(&iv(9, 0, 12, 0)));
        assert!(!w.contains(&iv(8, 59, 10, 0)));
    }
}

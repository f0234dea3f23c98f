//! Greedy Allocator.
//!
//! Tasks are placed strictly in the order given (highest score first). Each
//! placement is written into the shared occupied set before the next task's
//! slots are resolved, so a lower-priority task can never take time from a
//! higher one. There is no backtracking.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::energy::EnergyProfile;
use crate::interval::{subtract, Interval};
use crate::occupied::{Occupied, OccupiedKind, OccupiedSet};
use crate::scorer::ScoredTask;
use crate::slots::SlotResolver;
use crate::task::Task;

/// A task placed into `[interval.start, interval.end)` on a local date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub task_id: String,
    pub date: NaiveDate,
    pub interval: Interval,
}

impl Allocation {
    pub fn new(task_id: impl Into<String>, date: NaiveDate, interval: Interval) -> Self {
        Self {
            task_id: task_id.into(),
            date,
            interval,
        }
    }
}

/// A task whose candidate slots ran out before its duration was covered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unscheduled {
    pub task_id: String,
    pub requested_minutes: i64,
    pub placed_minutes: i64,
}

impl Unscheduled {
    pub fn remaining_minutes(&self) -> i64 {
        self.requested_minutes - self.placed_minutes
    }

    /// Some time was placed, just not all of it.
    pub fn is_partial(&self) -> bool {
        self.placed_minutes > 0
    }
}

/// Result of placing one task: raw fragments plus whatever did not fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub fragments: Vec<Allocation>,
    pub remaining: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationOutcome {
    /// Merged allocations, grouped by task in priority order.
    pub allocations: Vec<Allocation>,
    pub unscheduled: Vec<Unscheduled>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyAllocator {
    resolver: SlotResolver,
}

impl GreedyAllocator {
    pub fn new(resolver: SlotResolver) -> Self {
        Self { resolver }
    }

    /// Place one task, appending every fragment to `occupied`.
    ///
    /// Dates are walked chronologically and slots within a date by start time.
    /// A slot longer than what is left receives only the remainder.
    pub fn place(
        &self,
        task: &Task,
        profile: &EnergyProfile,
        occupied: &mut OccupiedSet,
        now: DateTime<Utc>,
    ) -> Placement {
        let mut remaining = Duration::minutes(i64::from(task.duration_minutes));
        let mut fragments = Vec::new();

        'dates: for day in self.resolver.resolve(task, profile, occupied, now) {
            let mut slots = day.slots;
            slots.sort_by_key(|s| s.start);

            for slot in slots {
                // Candidates from overlapping windows can overlap each other.
                for free in subtract(slot, &occupied.overlapping(&slot)) {
                    let take = if free.duration() >= remaining {
                        Interval::new(free.start, free.start + remaining)
                    } else {
                        free
                    };
                    occupied.insert(Occupied::new(take, OccupiedKind::Placed, Some(task.id.clone())));
                    debug!(task_id = %task.id, fragment = %take, "placed fragment");
                    fragments.push(Allocation::new(task.id.clone(), day.date, take));
                    remaining -= take.duration();
                    if remaining <= Duration::zero() {
                        break 'dates;
                    }
                }
            }
        }

        Placement {
            fragments,
            remaining: remaining.max(Duration::zero()),
        }
    }

    /// Place every task in order and merge each task's fragments.
    pub fn allocate(
        &self,
        ranked: &[ScoredTask],
        profile: &EnergyProfile,
        occupied: &mut OccupiedSet,
        now: DateTime<Utc>,
    ) -> AllocationOutcome {
        let mut outcome = AllocationOutcome::default();

        for scored in ranked {
            let task = &scored.task;
            let placement = self.place(task, profile, occupied, now);

            if placement.remaining > Duration::zero() {
                let requested = i64::from(task.duration_minutes);
                let record = Unscheduled {
                    task_id: task.id.clone(),
                    requested_minutes: requested,
                    placed_minutes: requested - placement.remaining.num_minutes(),
                };
                warn!(
                    task_id = %task.id,
                    remaining_minutes = record.remaining_minutes(),
                    partial = record.is_partial(),
                    "task could not be fully scheduled"
                );
                outcome.unscheduled.push(record);
            }

            let merged = merge_fragments(placement.fragments);
            if merged.len() > 1 {
                info!(task_id = %task.id, blocks = merged.len(), "task split across blocks");
            }
            outcome.allocations.extend(merged);
        }

        outcome
    }
}

/// Join fragments of the same task that touch end-to-start on the same date.
///
/// Fragments are sorted by task, date and start first. A gap, a date change or
/// a different task starts a new allocation.
pub fn merge_fragments(mut fragments: Vec<Allocation>) -> Vec<Allocation> {
    fragments.sort_by(|a, b| {
        (a.task_id.as_str(), a.date, a.interval.start).cmp(&(b.task_id.as_str(), b.date, b.interval.start))
    });

    let mut out: Vec<Allocation> = Vec::with_capacity(fragments.len());
    for frag in fragments {
        match out.last_mut() {
            Some(prev)
                if prev.task_id == frag.task_id
                    && prev.date == frag.date
                    && prev.interval.end == frag.interval.start =>
            {
                prev.interval.end = frag.interval.end;
            }
            _ => out.push(frag),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{EnergyThresholds, TemplateRow};
    use crate::scorer::TaskScorer;
    use crate::task::{EnergyLevel, Impact};
    use chrono::TimeZone;
    use chrono_tz::Tz;

    fn london() -> Tz {
        "Europe/London".parse().unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, h, m, 0).unwrap()
    }

    fn profile(rows: &[TemplateRow]) -> EnergyProfile {
        EnergyProfile::from_template(rows, monday(), 7, london(), &EnergyThresholds::default()).0
    }

    #[test]
    fn places_task_at_window_start() {
        let p = profile(&[TemplateRow::new("Tuesday", "09:00 - 10:30", "", "8", "work")]);
        let mut occ = OccupiedSet::new();
        let task = Task::new("t1", "report").with_deadline(at(5, 8, 0));
        let placed = GreedyAllocator::default().place(&task, &p, &mut occ, at(2, 8, 0));
        assert_eq!(placed.remaining, Duration::zero());
        assert_eq!(placed.fragments.len(), 1);
        assert_eq!(placed.fragments[0].interval, Interval::new(at(3, 9, 0), at(3, 10, 0)));
        assert!(occ.is_free(&Interval::new(at(3, 10, 0), at(3, 10, 30))));
        assert!(!occ.is_free(&Interval::new(at(3, 9, 30), at(3, 9, 45))));
    }

    #[test]
    fn splits_across_days_when_needed() {
        let p = profile(&[
            TemplateRow::new("Monday", "09:00 - 09:30", "", "8", "work"),
            TemplateRow::new("Tuesday", "09:00 - 09:45", "", "8", "work"),
        ]);
        let mut occ = OccupiedSet::new();
        let task = Task::new("t1", "report").with_duration(60);
        let placed = GreedyAllocator::default().place(&task, &p, &mut occ, at(2, 7, 0));
        assert_eq!(
            placed.fragments.iter().map(|f| f.interval).collect::<Vec<_>>(),
            vec![Interval::new(at(2, 9, 0), at(2, 9, 30)), Interval::new(at(3, 9, 0), at(3, 9, 30))]
        );
    }

    #[test]
    fn higher_score_claims_the_only_slot() {
        let p = profile(&[TemplateRow::new("Monday", "09:00 - 10:00", "", "8", "work")]);
        let scorer = TaskScorer::default();
        let ranked = scorer.rank(
            vec![
                Task::new("low", "low").with_impact(Impact::Low),
                Task::new("high", "high").with_impact(Impact::VeryHigh),
            ],
            at(2, 7, 0),
        );
        let mut occ = OccupiedSet::new();
        let out = GreedyAllocator::default().allocate(&ranked, &p, &mut occ, at(2, 7, 0));
        assert_eq!(out.allocations.len(), 1);
        assert_eq!(out.allocations[0].task_id, "high");
        assert_eq!(out.unscheduled.len(), 1);
        assert_eq!(out.unscheduled[0].task_id, "low");
        assert!(!out.unscheduled[0].is_partial());
    }

    #[test]
    fn partial_placement_is_reported() {
        let p = profile(&[TemplateRow::new("Monday", "09:00 - 09:45", "", "8", "work")]);
        let ranked = TaskScorer::default().rank(
            vec![Task::new("t1", "big").with_duration(120).with_energy(EnergyLevel::Low)],
            at(2, 7, 0),
        );
        let mut occ = OccupiedSet::new();
        let out = GreedyAllocator::default().allocate(&ranked, &p, &mut occ, at(2, 7, 0));
        assert_eq!(out.allocations.len(), 1);
        assert_eq!(out.unscheduled[0].placed_minutes, 45);
        assert_eq!(out.unscheduled[0].remaining_minutes(), 75);
        assert!(out.unscheduled[0].is_partial());
    }

    #[test]
    fn overlapping_windows_do_not_double_book() {
        let p = profile(&[
            TemplateRow::new("Monday", "09:00 - 09:30", "", "8", "work"),
            TemplateRow::new("Monday", "09:15 - 09:45", "", "8", "work"),
        ]);
        let mut occ = OccupiedSet::new();
        let task = Task::new("t1", "report").with_duration(60);
        let placed = GreedyAllocator::default().place(&task, &p, &mut occ, at(2, 7, 0));
        let merged = merge_fragments(placed.fragments);
        assert_eq!(merged, vec![Allocation::new("t1", monday(), Interval::new(at(2, 9, 0), at(2, 9, 45)))]);
        assert_eq!(placed.remaining, Duration::minutes(15));
    }

    #[test]
    fn merge_joins_only_touching_fragments() {
        let d = monday();
        let frags = vec![
            Allocation::new("t1", d, Interval::new(at(2, 10, 0), at(2, 10, 30))),
            Allocation::new("t1", d, Interval::new(at(2, 9, 0), at(2, 10, 0))),
            Allocation::new("t1", d, Interval::new(at(2, 11, 0), at(2, 11, 15))),
            Allocation::new("t2", d, Interval::new(at(2, 10, 30), at(2, 11, 0))),
        ];
        let merged = merge_fragments(frags);
        assert_eq!(
            merged,
            vec![
                Allocation::new("t1", d, Interval::new(at(2, 9, 0), at(2, 10, 30))),
                Allocation::new("t1", d, Interval::new(at(2, 11, 0), at(2, 11, 15))),
                Allocation::new("t2", d, Interval::new(at(2, 10, 30), at(2, 11, 0))),
            ]
        );
        // Idempotent on its own output.
        assert_eq!(merge_fragments(merged.clone()), merged);
    }
}

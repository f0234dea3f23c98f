//! Slot Resolver: free, constraint-satisfying time for one task.
//!
//! For every window that accepts the task, the occupied set is subtracted and
//! the remainders become candidate slots. A remainder shorter than the task is
//! chunked, each chunk re-checked against the occupied set, and the surviving
//! chunks merged back together, so windows broken up by short meetings still
//! offer their free stretches.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::energy::EnergyProfile;
use crate::error::ConfigurationError;
use crate::interval::{chunk, merge, subtract, Interval};
use crate::occupied::OccupiedSet;
use crate::task::{EnergyLevel, Task};

/// Chunk sizes used when a free remainder is shorter than the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkPolicy {
    /// Low and medium energy tasks.
    pub standard_minutes: i64,
    pub high_energy_minutes: i64,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            standard_minutes: 15,
            high_energy_minutes: 30,
        }
    }
}

impl ChunkPolicy {
    pub fn size_for(&self, energy: EnergyLevel) -> Duration {
        match energy {
            EnergyLevel::High => Duration::minutes(self.high_energy_minutes),
            EnergyLevel::Low | EnergyLevel::Medium => Duration::minutes(self.standard_minutes),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.standard_minutes <= 0 {
            return Err(ConfigurationError::NonPositive { name: "chunking.standard_minutes" });
        }
        if self.high_energy_minutes <= 0 {
            return Err(ConfigurationError::NonPositive { name: "chunking.high_energy_minutes" });
        }
        Ok(())
    }
}

/// Candidate slots on one local date, largest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub slots: Vec<Interval>,
}

impl DaySlots {
    pub fn total_minutes(&self) -> i64 {
        self.slots.iter().map(Interval::minutes).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlotResolver {
    chunking: ChunkPolicy,
}

impl SlotResolver {
    pub fn new(chunking: ChunkPolicy) -> Self {
        Self { chunking }
    }

    /// Candidate slots for `task`, per date in chronological order.
    ///
    /// Windows that end at or before `now`, or start at or after the task's
    /// deadline, are skipped; the rest are clipped to `[now, deadline)`. Dates
    /// with nothing left are omitted.
    pub fn resolve(
        &self,
        task: &Task,
        profile: &EnergyProfile,
        occupied: &OccupiedSet,
        now: DateTime<Utc>,
    ) -> Vec<DaySlots> {
        let needed = Duration::minutes(i64::from(task.duration_minutes));
        let size = self.chunking.size_for(task.energy);
        let mut out = Vec::new();

        for (date, windows) in profile.iter() {
            let mut slots = Vec::new();

            for window in windows {
                let iv = window.interval;
                if iv.end <= now || task.deadline.is_some_and(|d| iv.start >= d) {
                    continue;
                }
                if !window.accepts(task) {
                    continue;
                }
                let bounds = Interval::new(now, task.deadline.unwrap_or(iv.end));
                let Some(usable) = iv.intersect(&bounds) else {
                    continue;
                };

                for free in subtract(usable, &occupied.overlapping(&usable)) {
                    if free.duration() >= needed {
                        slots.push(free);
                        continue;
                    }
                    let pieces: Vec<Interval> = chunk(free, size)
                        .into_iter()
                        .filter(|c| occupied.is_free(c))
                        .collect();
                    slots.extend(merge(pieces));
                }
            }

            if slots.is_empty() {
                continue;
            }
            slots.sort_by(|a, b| b.duration().cmp(&a.duration()).then(a.start.cmp(&b.start)));
            slots.dedup();
            debug!(task_id = %task.id, %date, count = slots.len(), "candidate slots");
            out.push(DaySlots { date, slots });
        }

        out
    }
}

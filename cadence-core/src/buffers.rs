//! Occupied time derived from calendar commitments and the working day.
//!
//! In-person commitments get travel time on both sides, virtual ones get a
//! screen-free rest period afterwards. Daily breaks are optional.

use chrono::{Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::interval::Interval;
use crate::occupied::{Occupied, OccupiedKind, OccupiedSet};
use crate::time::local_to_utc;

/// An existing calendar event that blocks scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCommitment {
    pub id: String,
    pub summary: String,
    pub interval: Interval,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub all_day: bool,
}

impl CalendarCommitment {
    pub fn new(id: impl Into<String>, summary: impl Into<String>, interval: Interval) -> Self {
        Self {
            id: id.into(),
            summary: summary.into(),
            interval,
            location: None,
            description: None,
            all_day: false,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn as_occupied(&self) -> Occupied {
        Occupied::new(self.interval, OccupiedKind::Commitment, Some(self.id.clone()))
    }

    fn has_location(&self) -> bool {
        self.location.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferPolicy {
    pub travel_minutes: i64,
    pub rest_minutes: i64,
    /// Case-insensitive markers of a virtual meeting, matched in description or location.
    pub virtual_keywords: Vec<String>,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            travel_minutes: 30,
            rest_minutes: 15,
            virtual_keywords: ["zoom", "google meet", "teams", "skype", "webex", "attendanywhere"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl BufferPolicy {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.travel_minutes < 0 {
            return Err(ConfigurationError::NonPositive { name: "buffers.travel_minutes" });
        }
        if self.rest_minutes < 0 {
            return Err(ConfigurationError::NonPositive { name: "buffers.rest_minutes" });
        }
        Ok(())
    }

    pub fn is_virtual(&self, commitment: &CalendarCommitment) -> bool {
        let haystack = format!(
            "{} {}",
            commitment.description.as_deref().unwrap_or_default(),
            commitment.location.as_deref().unwrap_or_default()
        )
        .to_lowercase();
        self.virtual_keywords
            .iter()
            .any(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
    }

    /// Buffers implied by one commitment. All-day events get none.
    pub fn buffers_for(&self, commitment: &CalendarCommitment) -> Vec<Occupied> {
        if commitment.all_day {
            return Vec::new();
        }
        let key = Some(commitment.id.clone());
        let iv = commitment.interval;

        if self.is_virtual(commitment) {
            let rest = Interval::from_minutes(iv.end, self.rest_minutes);
            if rest.is_empty() {
                return Vec::new();
            }
            return vec![Occupied::new(rest, OccupiedKind::Rest, key)];
        }

        if commitment.has_location() {
            let travel = Duration::minutes(self.travel_minutes);
            return [
                Interval::new(iv.start - travel, iv.start),
                Interval::new(iv.end, iv.end + travel),
            ]
            .into_iter()
            .filter(|i| !i.is_empty())
            .map(|i| Occupied::new(i, OccupiedKind::Travel, key.clone()))
            .collect();
        }

        Vec::new()
    }
}

/// A fixed break at a local time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedBreak {
    pub at: NaiveTime,
    pub minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunchPolicy {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub min_minutes: i64,
    pub max_minutes: i64,
    pub grid_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakPolicy {
    pub enabled: bool,
    pub morning: FixedBreak,
    pub afternoon: FixedBreak,
    pub lunch: LunchPolicy,
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            morning: FixedBreak { at: hm(9, 30), minutes: 15 },
            afternoon: FixedBreak { at: hm(15, 30), minutes: 15 },
            lunch: LunchPolicy {
                window_start: hm(12, 0),
                window_end: hm(14, 0),
                min_minutes: 30,
                max_minutes: 60,
                grid_minutes: 15,
            },
        }
    }
}

impl BreakPolicy {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let l = &self.lunch;
        if l.grid_minutes <= 0 {
            return Err(ConfigurationError::NonPositive { name: "breaks.lunch.grid_minutes" });
        }
        if l.min_minutes <= 0 || l.max_minutes < l.min_minutes {
            return Err(ConfigurationError::NonPositive { name: "breaks.lunch.min_minutes" });
        }
        if self.morning.minutes < 0 || self.afternoon.minutes < 0 {
            return Err(ConfigurationError::NonPositive { name: "breaks.minutes" });
        }
        Ok(())
    }

    /// Breaks for one local date, given what is already occupied.
    ///
    /// Lunch is the longest free block between `min_minutes` and `max_minutes`
    /// on the grid inside the lunch window, earliest first. When nothing fits, a
    /// `min_minutes` lunch is forced at the window start.
    pub fn breaks_for(&self, date: NaiveDate, tz: Tz, occupied: &OccupiedSet) -> Vec<Occupied> {
        if !self.enabled {
            return Vec::new();
        }
        let mut out = Vec::new();

        for (label, b) in [("morning", self.morning), ("afternoon", self.afternoon)] {
            if let Some(start) = local_to_utc(tz, date, b.at) {
                let iv = Interval::from_minutes(start, b.minutes);
                if !iv.is_empty() {
                    out.push(Occupied::new(iv, OccupiedKind::Break, Some(format!("break:{date}:{label}"))));
                }
            }
        }

        if let Some(lunch) = self.pick_lunch(date, tz, occupied) {
            out.push(Occupied::new(lunch, OccupiedKind::Break, Some(format!("break:{date}:lunch"))));
        }
        out
    }

    fn pick_lunch(&self, date: NaiveDate, tz: Tz, occupied: &OccupiedSet) -> Option<Interval> {
        let l = &self.lunch;
        let window = Interval::new(
            local_to_utc(tz, date, l.window_start)?,
            local_to_utc(tz, date, l.window_end)?,
        );
        if window.is_empty() {
            return None;
        }

        let grid = Duration::minutes(l.grid_minutes);
        let mut length = l.max_minutes;
        while length >= l.min_minutes {
            let mut start = window.start;
            loop {
                let candidate = Interval::from_minutes(start, length);
                if candidate.end > window.end {
                    break;
                }
                if occupied.is_free(&candidate) {
                    return Some(candidate);
                }
                start += grid;
            }
            length -= l.grid_minutes;
        }

        Some(Interval::from_minutes(window.start, l.min_minutes))
    }
}

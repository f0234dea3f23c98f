//! Calendar export parser.
//!
//! Expected input: a JSON array of events
//!   [{"id": "abc", "summary": "Standup", "location": "Zoom",
//!     "start": {"dateTime": "2026-03-02T09:00:00Z"}, "end": {"dateTime": "2026-03-02T09:15:00Z"}}]
//!
//! All-day events use `{"date": "YYYY-MM-DD"}` with an exclusive end date.
//! Events whose description carries the scheduler marker were written by an
//! earlier run; they are returned as persisted allocations, not commitments.

use anyhow::{anyhow, Context, Result};
use cadence_core::time::{parse_timestamp, start_of_local_day};
use cadence_core::{CalendarCommitment, Interval, PersistedAllocation};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::path::Path;
use tracing::warn;

use crate::types::{RawCalendarEvent, RawEventTime};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarIntake {
    pub commitments: Vec<CalendarCommitment>,
    pub persisted: Vec<PersistedAllocation>,
    /// Event id and reason for events that could not be used.
    pub skipped: Vec<(String, String)>,
}

impl CalendarIntake {
    /// Commitments overlapping `horizon`.
    pub fn commitments_within(&self, horizon: &Interval) -> Vec<CalendarCommitment> {
        self.commitments
            .iter()
            .filter(|c| c.interval.overlaps(horizon))
            .cloned()
            .collect()
    }
}

/// Task id written after "Task ID:" in an engine-created event description.
pub fn task_id_from_description(description: &str) -> Result<Option<String>> {
    let re = Regex::new(r"Task ID:\s*(\S+)")?;
    Ok(re.captures(description).map(|c| c[1].to_string()))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Returns (instant, all_day).
fn event_time(t: &RawEventTime, tz: Tz) -> std::result::Result<(DateTime<Utc>, bool), String> {
    if let Some(dt) = t.date_time.as_deref() {
        let at = parse_timestamp(dt, tz).ok_or_else(|| format!("unreadable dateTime '{dt}'"))?;
        return Ok((at, false));
    }
    if let Some(d) = t.date.as_deref() {
        let date = parse_date(d).ok_or_else(|| format!("unreadable date '{d}'"))?;
        let at = start_of_local_day(tz, date).ok_or_else(|| format!("midnight of {date} does not exist"))?;
        return Ok((at, true));
    }
    Err("event time has neither dateTime nor date".to_string())
}

fn event_interval(ev: &RawCalendarEvent, tz: Tz) -> std::result::Result<(Interval, bool), String> {
    let (start, all_day) = event_time(&ev.start, tz)?;
    let (mut end, _) = event_time(&ev.end, tz)?;
    // A single-day all-day event sometimes repeats the start date as its end.
    if all_day && end <= start {
        end = start + Duration::days(1);
    }
    let interval = Interval::new(start, end);
    if interval.is_empty() {
        return Err(format!("event ends before it starts ({start} .. {end})"));
    }
    Ok((interval, all_day))
}

/// Split a calendar export into commitments and engine-created allocations.
pub fn parse_calendar_json(json: &str, tz: Tz, marker: &str) -> Result<CalendarIntake> {
    let events: Vec<RawCalendarEvent> =
        serde_json::from_str(json).context("calendar export is not a JSON array of events")?;
    parse_calendar_events(&events, tz, marker)
}

pub fn parse_calendar_events(events: &[RawCalendarEvent], tz: Tz, marker: &str) -> Result<CalendarIntake> {
    if marker.trim().is_empty() {
        return Err(anyhow!("scheduler marker must not be empty"));
    }
    let mut intake = CalendarIntake::default();

    for ev in events {
        let (interval, all_day) = match event_interval(ev, tz) {
            Ok(v) => v,
            Err(reason) => {
                warn!(event_id = %ev.id, %reason, "calendar event skipped");
                intake.skipped.push((ev.id.clone(), reason));
                continue;
            }
        };

        let description = ev.description.as_deref().unwrap_or_default();
        if description.contains(marker) {
            match task_id_from_description(description)? {
                Some(task_id) => intake.persisted.push(PersistedAllocation {
                    event_id: ev.id.clone(),
                    task_id,
                    interval,
                }),
                None => {
                    let reason = "scheduler event without a task id".to_string();
                    warn!(event_id = %ev.id, "{reason}");
                    intake.skipped.push((ev.id.clone(), reason));
                }
            }
            continue;
        }

        intake.commitments.push(CalendarCommitment {
            id: ev.id.clone(),
            summary: ev.summary.clone(),
            interval,
            location: ev.location.clone(),
            description: ev.description.clone(),
            all_day,
        });
    }

    Ok(intake)
}

pub fn parse_calendar_file(path: impl AsRef<Path>, tz: Tz, marker: &str) -> Result<CalendarIntake> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_calendar_json(&json, tz, marker).with_context(|| format!("parsing {}", path.display()))
}

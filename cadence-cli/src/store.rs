//! Calendar store backed by the same JSON file the calendar source reads.
//!
//! New allocations are appended as events carrying the scheduler marker and
//! the task id in their description; the file is rewritten after every change
//! so a failure part-way through a run keeps what was already committed.

use anyhow::{Context, Result};
use cadence_core::{AllocationMetadata, AllocationStore, Interval, PersistedAllocation, PersistenceError, RetrievalError};
use cadence_core::time::to_local_rfc3339;
use cadence_ingest::{parse_calendar_events, RawCalendarEvent, RawEventTime};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::state::ensure_dir;

pub struct JsonCalendarStore {
    path: PathBuf,
    tz: Tz,
    marker: String,
    events: Vec<RawCalendarEvent>,
}

impl JsonCalendarStore {
    /// Load the calendar file; a missing file starts an empty calendar.
    pub fn open(path: impl Into<PathBuf>, tz: Tz, marker: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let events = if path.exists() {
            let s = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self {
            path,
            tz,
            marker: marker.into(),
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.events).context("serialize calendar")?;
        fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))
    }
}

fn event_time(at: DateTime<Utc>, tz: Tz) -> RawEventTime {
    RawEventTime::at(to_local_rfc3339(at, tz))
}

impl AllocationStore for JsonCalendarStore {
    fn fetch_persisted(&mut self, horizon: Interval) -> Result<Vec<PersistedAllocation>, RetrievalError> {
        let intake = parse_calendar_events(&self.events, self.tz, &self.marker)
            .map_err(|e| RetrievalError::new("calendar", format!("{e:#}")))?;
        Ok(intake
            .persisted
            .into_iter()
            .filter(|p| p.interval.overlaps(&horizon))
            .collect())
    }

    fn commit_allocation(
        &mut self,
        task_id: &str,
        interval: Interval,
        metadata: &AllocationMetadata,
    ) -> Result<String, PersistenceError> {
        let event_id = uuid::Uuid::new_v4().to_string();
        self.events.push(RawCalendarEvent {
            id: event_id.clone(),
            summary: metadata.title.clone(),
            description: Some(metadata.description.clone()),
            location: None,
            color_id: metadata.colour_id.clone(),
            start: event_time(interval.start, self.tz),
            end: event_time(interval.end, self.tz),
        });
        if let Err(e) = self.save() {
            self.events.pop();
            return Err(PersistenceError::new(task_id, format!("{e:#}")));
        }
        debug!(%task_id, %event_id, "allocation written");
        Ok(event_id)
    }

    fn update_allocation(&mut self, event_id: &str, interval: Interval) -> Result<(), PersistenceError> {
        let tz = self.tz;
        let Some(ev) = self.events.iter_mut().find(|e| e.id == event_id) else {
            return Err(PersistenceError::new(event_id, "no such event in the calendar file"));
        };
        let previous = (ev.start.clone(), ev.end.clone());
        ev.start = event_time(interval.start, tz);
        ev.end = event_time(interval.end, tz);

        if let Err(e) = self.save() {
            if let Some(ev) = self.events.iter_mut().find(|e| e.id == event_id) {
                (ev.start, ev.end) = previous;
            }
            return Err(PersistenceError::new(event_id, format!("{e:#}")));
        }
        debug!(%event_id, "allocation moved");
        Ok(())
    }
}

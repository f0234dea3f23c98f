//! File-backed collaborators for the scheduling kernel.

use anyhow::Result;
use cadence_core::{
    CalendarCommitment, CalendarSource, Interval, RetrievalError, Task, TaskSource, TemplateRow, TemplateSource,
    TemplateVariant,
};
use cadence_ingest::{parse_calendar_file, parse_tasks_file, parse_template_file};
use chrono_tz::Tz;
use std::path::PathBuf;
use tracing::{debug, info};

fn retrieval(source: &str, err: anyhow::Error) -> RetrievalError {
    RetrievalError::new(source, format!("{err:#}"))
}

/// Task-tracker JSON export.
pub struct TaskFile {
    pub path: PathBuf,
    pub tz: Tz,
}

impl TaskSource for TaskFile {
    fn fetch_tasks(&self) -> Result<Vec<Task>, RetrievalError> {
        let intake = parse_tasks_file(&self.path, self.tz).map_err(|e| retrieval("tasks", e))?;
        if !intake.skipped.is_empty() {
            info!(skipped = intake.skipped.len(), "tasks without a work/personal label or with bad fields were skipped");
        }
        Ok(intake.tasks)
    }
}

/// Weekly template CSVs, one per variant.
pub struct TemplateFiles {
    pub standard: PathBuf,
    pub hot_weather: Option<PathBuf>,
}

impl TemplateFiles {
    fn path_for(&self, variant: TemplateVariant) -> &PathBuf {
        match (variant, &self.hot_weather) {
            (TemplateVariant::HotWeather, Some(hot)) => hot,
            (TemplateVariant::HotWeather, None) => {
                debug!("no hot-weather template configured, using the standard one");
                &self.standard
            }
            (TemplateVariant::Standard, _) => &self.standard,
        }
    }
}

impl TemplateSource for TemplateFiles {
    fn fetch_weekly_template(&self, variant: TemplateVariant) -> Result<Vec<TemplateRow>, RetrievalError> {
        let path = self.path_for(variant);
        parse_template_file(path).map_err(|e| retrieval("template", e))
    }
}

/// Calendar JSON export. A missing file means an empty calendar.
pub struct CalendarFile {
    pub path: PathBuf,
    pub tz: Tz,
    pub marker: String,
}

impl CalendarSource for CalendarFile {
    fn fetch_commitments(&self, horizon: Interval) -> Result<Vec<CalendarCommitment>, RetrievalError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "calendar file not found, treating as empty");
            return Ok(Vec::new());
        }
        let intake = parse_calendar_file(&self.path, self.tz, &self.marker).map_err(|e| retrieval("calendar", e))?;
        Ok(intake.commitments_within(&horizon))
    }
}

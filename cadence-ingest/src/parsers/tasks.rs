//! Task-tracker export parser.
//!
//! Expected input: a JSON array of tasks
//!   [{"id": "8812", "content": "Quarterly figures", "description": "about 1.5 hours",
//!     "labels": ["work", "high_energy", "data_analysis"], "notes": [],
//!     "due": {"date": "2026-03-05"}}]
//!
//! Only tasks labelled `work` or `personal` are scheduled. Energy, impact and
//! category come from labels; the duration estimate is read from the
//! description, then the notes.

use anyhow::{Context, Result};
use cadence_core::time::{end_of_local_day, parse_timestamp};
use cadence_core::{Category, EnergyLevel, Impact, Scope, Task};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

use crate::types::{RawDue, RawTask};

pub const DEFAULT_DURATION_MINUTES: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTask {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskIntake {
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedTask>,
}

/// Pulls a duration estimate out of free text.
///
/// Fractional hours ("0.5 hours", "1.5h") are tried first so "0.5 hours" is
/// not read as "5 hours". Then whole numbers with a unit: "1h", "2 hours",
/// "90m", "45 minutes".
pub struct DurationExtractor {
    fractional: Regex,
    whole: Regex,
}

impl DurationExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fractional: Regex::new(r"(\d*\.\d+)\s*h(?:ours?|rs?)?\b")?,
            whole: Regex::new(r"(\d+)\s*(hours?|hrs?|h|minutes?|mins?|m)\b")?,
        })
    }

    pub fn minutes(&self, text: &str) -> Option<u32> {
        let text = text.to_lowercase();

        if let Some(caps) = self.fractional.captures(&text) {
            let hours: f64 = caps[1].parse().ok()?;
            return Some((hours * 60.0).round() as u32);
        }

        let caps = self.whole.captures(&text)?;
        let value: u32 = caps[1].parse().ok()?;
        if caps[2].starts_with('h') {
            Some(value.saturating_mul(60))
        } else {
            Some(value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LabelAttributes {
    energy: EnergyLevel,
    impact: Impact,
    category: Option<Category>,
    scope: Option<Scope>,
}

fn map_labels(labels: &[String]) -> LabelAttributes {
    let mut attrs = LabelAttributes {
        energy: EnergyLevel::Medium,
        impact: Impact::Low,
        category: None,
        scope: None,
    };

    for label in labels {
        let l = label.trim().to_lowercase();
        match l.as_str() {
            "low_energy" => attrs.energy = EnergyLevel::Low,
            "medium_energy" => attrs.energy = EnergyLevel::Medium,
            "high_energy" => attrs.energy = EnergyLevel::High,
            "low_impact" => attrs.impact = Impact::Low,
            "medium_impact" => attrs.impact = Impact::Medium,
            "high_impact" => attrs.impact = Impact::High,
            "veryhigh_impact" | "very_high_impact" => attrs.impact = Impact::VeryHigh,
            "work" => attrs.scope = Some(Scope::Work),
            "personal" => attrs.scope = Some(Scope::Personal),
            other => {
                if let Some(c) = Category::ALL.into_iter().find(|c| c.label() == other) {
                    attrs.category = Some(c);
                }
            }
        }
    }
    attrs
}

fn parse_due(due: &RawDue, tz: Tz) -> std::result::Result<Option<DateTime<Utc>>, String> {
    if let Some(dt) = due.datetime.as_deref().filter(|s| !s.trim().is_empty()) {
        return parse_timestamp(dt, tz)
            .map(Some)
            .ok_or_else(|| format!("unreadable due datetime '{dt}'"));
    }
    if let Some(d) = due.date.as_deref().filter(|s| !s.trim().is_empty()) {
        let date = NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
            .map_err(|_| format!("unreadable due date '{d}'"))?;
        return end_of_local_day(tz, date)
            .map(Some)
            .ok_or_else(|| format!("end of {date} does not exist in {}", tz.name()));
    }
    Ok(None)
}

fn convert(raw: &RawTask, tz: Tz, durations: &DurationExtractor) -> std::result::Result<Task, String> {
    let attrs = map_labels(&raw.labels);
    let scope = attrs.scope.ok_or_else(|| "no work/personal label".to_string())?;

    let description = raw.description.as_deref().unwrap_or_default();
    let duration = durations
        .minutes(description)
        .or_else(|| durations.minutes(&raw.notes.join(" ")))
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_DURATION_MINUTES);

    let deadline = match &raw.due {
        Some(due) => parse_due(due, tz)?,
        None => None,
    };

    let mut task = Task::new(raw.id.trim(), raw.content.trim())
        .with_duration(duration)
        .with_energy(attrs.energy)
        .with_impact(attrs.impact)
        .with_scope(scope);
    if let Some(c) = attrs.category {
        task = task.with_category(c);
    }
    if let Some(d) = deadline {
        task = task.with_deadline(d);
    }
    task.validate()?;
    Ok(task)
}

/// Parse a JSON task export.
pub fn parse_tasks_json(json: &str, tz: Tz) -> Result<TaskIntake> {
    let raw: Vec<RawTask> = serde_json::from_str(json).context("task export is not a JSON array of tasks")?;
    let durations = DurationExtractor::new()?;

    let mut intake = TaskIntake::default();
    for r in &raw {
        match convert(r, tz, &durations) {
            Ok(task) => {
                debug!(task_id = %task.id, minutes = task.duration_minutes, "task parsed");
                intake.tasks.push(task);
            }
            Err(reason) => {
                warn!(task_id = %r.id, %reason, "task skipped");
                intake.skipped.push(SkippedTask {
                    id: r.id.clone(),
                    reason,
                });
            }
        }
    }
    Ok(intake)
}

pub fn parse_tasks_file(path: impl AsRef<Path>, tz: Tz) -> Result<TaskIntake> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_tasks_json(&json, tz).with_context(|| format!("parsing {}", path.display()))
}

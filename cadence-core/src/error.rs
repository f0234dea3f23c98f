//! Error taxonomy for a scheduling run.
//!
//! Only configuration problems and retrieval failures of the task list or the
//! availability template abort a run. Everything else is recovered locally and
//! surfaced as an [`Issue`] on the plan.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stage a problem was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Configuration,
    Weather,
    Template,
    Tasks,
    Calendar,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Configuration => "configuration",
            Stage::Weather => "weather",
            Stage::Template => "template",
            Stage::Tasks => "tasks",
            Stage::Calendar => "calendar",
            Stage::Persistence => "persistence",
        };
        f.write_str(s)
    }
}

/// Invalid or missing configuration. Always fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("weight '{name}' must be a finite, non-negative number (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("{name} must be greater than zero")]
    NonPositive { name: &'static str },

    #[error("energy thresholds must satisfy 1 < medium_from < high_from <= 10 (got {medium_from}/{high_from})")]
    InvalidThresholds { medium_from: u8, high_from: u8 },

    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("availability template '{variant}' has no rows")]
    EmptyTemplate { variant: String },

    #[error("event marker must not be empty")]
    EmptyMarker,

    #[error("energy profile is empty: no usable availability windows in the horizon")]
    EmptyProfile,
}

/// A collaborator fetch failed.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{source_name}: {message}")]
pub struct RetrievalError {
    pub source_name: String,
    pub message: String,
}

impl RetrievalError {
    pub fn new(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Writing one allocation to the external store failed.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("persisting task '{task_id}' failed: {message}")]
pub struct PersistenceError {
    pub task_id: String,
    pub message: String,
}

impl PersistenceError {
    pub fn new(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            message: message.into(),
        }
    }
}

/// Fatal run error. Carries the stage that failed so callers can surface it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{stage} stage failed: {source}")]
    Retrieval {
        stage: Stage,
        #[source]
        source: RetrievalError,
    },
}

impl PlanError {
    pub fn stage(&self) -> Stage {
        match self {
            PlanError::Configuration(_) => Stage::Configuration,
            PlanError::Retrieval { stage, .. } => *stage,
        }
    }
}

/// A recoverable problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub stage: Stage,
    pub message: String,
}

impl Issue {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_error_reports_failing_stage() {
        let err = PlanError::Retrieval {
            stage: Stage::Tasks,
            source: RetrievalError::new("tasks.json", "file not found"),
        };
        assert_eq!(err.stage(), Stage::Tasks);
        assert_eq!(err.to_string(), "tasks stage failed: tasks.json: file not found");

        let cfg: PlanError = ConfigurationError::EmptyProfile.into();
        assert_eq!(cfg.stage(), Stage::Configuration);
    }

    #[test]
    fn issue_display_includes_stage() {
        let issue = Issue::new(Stage::Template, "row 3: unknown weekday 'Funday'");
        assert_eq!(issue.to_string(), "[template] row 3: unknown weekday 'Funday'");
    }
}

//! Run configuration for the scheduling engine.
//!
//! Every field has a default, so an empty TOML table is a valid config.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::buffers::{BreakPolicy, BufferPolicy};
use crate::energy::EnergyThresholds;
use crate::error::ConfigurationError;
use crate::scorer::{TaskScorer, Weights};
use crate::slots::ChunkPolicy;
use crate::task::Category;
use crate::time::parse_tz;
use crate::weather::WeatherPolicy;

/// Description prefix of every calendar event the engine creates.
pub const DEFAULT_MARKER: &str = "Scheduled by task scheduler";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// IANA zone used for templates, day boundaries and date-only deadlines.
    pub timezone: String,
    pub horizon_days: u32,
    pub weights: Weights,
    pub max_duration_minutes: u32,
    pub overdue_urgency: f64,
    pub energy_thresholds: EnergyThresholds,
    pub chunking: ChunkPolicy,
    pub buffers: BufferPolicy,
    pub breaks: BreakPolicy,
    pub weather: WeatherPolicy,
    /// Category label -> calendar colour id.
    pub colours: BTreeMap<String, String>,
    pub marker: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let colours = [
            (Category::Email, "3"),
            (Category::Admin, "9"),
            (Category::Writing, "7"),
            (Category::DataAnalysis, "10"),
            (Category::ThinkingPlanning, "2"),
            (Category::ReadingSearching, "6"),
            (Category::GivingTalks, "4"),
        ]
        .into_iter()
        .map(|(c, id)| (c.label().to_string(), id.to_string()))
        .collect();

        Self {
            timezone: "Europe/London".to_string(),
            horizon_days: 28,
            weights: Weights::default(),
            max_duration_minutes: 480,
            overdue_urgency: 2.0,
            energy_thresholds: EnergyThresholds::default(),
            chunking: ChunkPolicy::default(),
            buffers: BufferPolicy::default(),
            breaks: BreakPolicy::default(),
            weather: WeatherPolicy::default(),
            colours,
            marker: DEFAULT_MARKER.to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Check every field and resolve the timezone.
    pub fn validate(&self) -> Result<Tz, ConfigurationError> {
        let tz = parse_tz(&self.timezone)
            .ok_or_else(|| ConfigurationError::InvalidTimezone(self.timezone.clone()))?;
        if self.horizon_days == 0 {
            return Err(ConfigurationError::NonPositive { name: "horizon_days" });
        }
        if self.max_duration_minutes == 0 {
            return Err(ConfigurationError::NonPositive { name: "max_duration_minutes" });
        }
        if !self.overdue_urgency.is_finite() || self.overdue_urgency < 0.0 {
            return Err(ConfigurationError::InvalidWeight {
                name: "overdue_urgency",
                value: self.overdue_urgency,
            });
        }
        if self.marker.trim().is_empty() {
            return Err(ConfigurationError::EmptyMarker);
        }
        self.weights.validate()?;
        self.energy_thresholds.validate()?;
        self.chunking.validate()?;
        self.buffers.validate()?;
        self.breaks.validate()?;
        Ok(tz)
    }

    pub fn scorer(&self) -> TaskScorer {
        TaskScorer::new(self.weights, self.max_duration_minutes, self.overdue_urgency)
    }

    pub fn colour_for(&self, category: Option<Category>) -> Option<&str> {
        category.and_then(|c| self.colours.get(c.label()).map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = SchedulerConfig::default();
        let tz = cfg.validate().unwrap();
        assert_eq!(tz.name(), "Europe/London");
        assert_eq!(cfg.colour_for(Some(Category::DataAnalysis)), Some("10"));
        assert_eq!(cfg.colour_for(None), None);
    }

    #[test]
    fn rejects_bad_values() {
        let cfg = SchedulerConfig { timezone: "Nowhere/Land".into(), ..SchedulerConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigurationError::InvalidTimezone("Nowhere/Land".into())));

        let cfg = SchedulerConfig { horizon_days: 0, ..SchedulerConfig::default() };
        assert!(cfg.validate().is_err());

        let mut cfg = SchedulerConfig::default();
        cfg.weights.deadline = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigurationError::InvalidWeight { name: "deadline", .. })));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: SchedulerConfig =
            serde_json::from_str(r#"{"horizon_days": 7, "weights": {"impact": 0.5}}"#).unwrap();
        assert_eq!(cfg.horizon_days, 7);
        assert_eq!(cfg.weights.impact, 0.5);
        assert_eq!(cfg.weights.energy, 0.4);
        assert_eq!(cfg.marker, DEFAULT_MARKER);
    }
}

//! Hot-weather signal used to pick the availability template.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::energy::TemplateVariant;

/// One point of an hourly forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub time: DateTime<Utc>,
    /// Feels-like temperature in °C; `None` when the forecast has no value.
    #[serde(default)]
    pub feels_like_c: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherPolicy {
    /// Any reading strictly above this selects the hot-weather template.
    pub hot_threshold_c: f64,
}

impl Default for WeatherPolicy {
    fn default() -> Self {
        Self { hot_threshold_c: 22.0 }
    }
}

/// True when any reading with data is above `threshold`.
pub fn is_hot(readings: &[WeatherReading], threshold: f64) -> bool {
    readings
        .iter()
        .filter_map(|r| r.feels_like_c)
        .any(|t| t > threshold)
}

pub fn variant_for(hot: bool) -> TemplateVariant {
    if hot {
        TemplateVariant::HotWeather
    } else {
        TemplateVariant::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(h: u32, t: Option<f64>) -> WeatherReading {
        WeatherReading {
            time: Utc.with_ymd_and_hms(2026, 7, 10, h, 0, 0).unwrap(),
            feels_like_c: t,
        }
    }

    #[test]
    fn hot_when_any_reading_exceeds_threshold() {
        let rs = vec![reading(9, Some(18.0)), reading(13, Some(23.5)), reading(17, None)];
        assert!(is_hot(&rs, 22.0));
        assert!(!is_hot(&rs, 24.0));
    }

    #[test]
    fn threshold_is_exclusive_and_missing_data_is_ignored() {
        assert!(!is_hot(&[reading(12, Some(22.0))], 22.0));
        assert!(!is_hot(&[reading(12, None)], 0.0));
        assert!(!is_hot(&[], 22.0));
        assert_eq!(variant_for(false), TemplateVariant::Standard);
    }
}

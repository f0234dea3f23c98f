//! Hot-weather lookup against an hourly point forecast.
//!
//! The forecast shape is `features[0].properties.timeSeries[]` with `time` and
//! `feelsLikeTemperature` per hour. A saved response can be used instead of
//! the HTTP endpoint via `[weather] readings_file`.

use anyhow::{anyhow, bail, Context, Result};
use cadence_core::{is_hot, RetrievalError, WeatherReading, WeatherSignal};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::WeatherSection;
use crate::state::resolve_path;

#[derive(Debug, Deserialize)]
struct Forecast {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(rename = "timeSeries", default)]
    time_series: Vec<HourlyPoint>,
}

#[derive(Debug, Deserialize)]
struct HourlyPoint {
    time: String,
    #[serde(rename = "feelsLikeTemperature", default)]
    feels_like_temperature: Option<f64>,
}

/// Forecast times come as "2026-03-02T09:00Z" as well as full RFC 3339.
fn parse_forecast_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%MZ")
                .ok()
                .map(|n| n.and_utc())
        })
}

pub fn parse_forecast(json: &str) -> Result<Vec<WeatherReading>> {
    let forecast: Forecast = serde_json::from_str(json).context("forecast is not the expected JSON shape")?;
    let Some(feature) = forecast.features.into_iter().next() else {
        bail!("forecast has no features");
    };
    feature
        .properties
        .time_series
        .into_iter()
        .map(|p| {
            let time = parse_forecast_time(&p.time).ok_or_else(|| anyhow!("unreadable forecast time '{}'", p.time))?;
            Ok(WeatherReading {
                time,
                feels_like_c: p.feels_like_temperature,
            })
        })
        .collect()
}

async fn fetch_forecast(section: &WeatherSection) -> Result<Vec<WeatherReading>> {
    let key = std::env::var(&section.api_key_env)
        .with_context(|| format!("{} is not set", section.api_key_env))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .context("build HTTP client")?;
    let body = client
        .get(&section.endpoint)
        .query(&[
            ("latitude", section.latitude.to_string()),
            ("longitude", section.longitude.to_string()),
        ])
        .header("apikey", key)
        .header("accept", "application/json")
        .send()
        .await
        .context("forecast request failed")?
        .error_for_status()
        .context("forecast request rejected")?
        .text()
        .await
        .context("reading forecast body")?;
    parse_forecast(&body)
}

async fn lookup_readings(section: &WeatherSection, base: &Path) -> Result<Vec<WeatherReading>> {
    match &section.readings_file {
        Some(p) => {
            let path = resolve_path(base, p);
            let json = std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            parse_forecast(&json).with_context(|| format!("parse {}", path.display()))
        }
        None => fetch_forecast(section).await,
    }
}

/// Outcome of the lookup, handed to the kernel as its weather signal.
#[derive(Debug, Clone)]
pub struct LookedUpWeather {
    outcome: Result<bool, RetrievalError>,
}

impl LookedUpWeather {
    pub fn known(hot: bool) -> Self {
        Self { outcome: Ok(hot) }
    }

    pub fn unknown(err: anyhow::Error) -> Self {
        Self {
            outcome: Err(RetrievalError::new("weather", format!("{err:#}"))),
        }
    }
}

impl WeatherSignal for LookedUpWeather {
    fn is_hot_weather(&self) -> Result<bool, RetrievalError> {
        self.outcome.clone()
    }
}

/// Resolve the weather signal. Disabled lookups answer "not hot".
pub async fn lookup(section: &WeatherSection, base: &Path, threshold_c: f64) -> LookedUpWeather {
    if !section.enabled {
        debug!("weather lookup disabled");
        return LookedUpWeather::known(false);
    }
    match lookup_readings(section, base).await {
        Ok(readings) => {
            let hot = is_hot(&readings, threshold_c);
            info!(readings = readings.len(), hot, "weather resolved");
            LookedUpWeather::known(hot)
        }
        Err(e) => LookedUpWeather::unknown(e),
    }
}

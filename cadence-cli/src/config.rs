use anyhow::{Context, Result};
use cadence_core::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{ensure_cadence_home, ensure_dir};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub sources: SourcesSection,
    pub weather: WeatherSection,
    pub logging: LoggingSection,
}

/// Input and output files. Relative paths are taken from the config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    pub tasks: PathBuf,
    pub template: PathBuf,
    /// Falls back to `template` when unset.
    pub hot_template: Option<PathBuf>,
    /// Calendar export read for commitments and written back with allocations.
    pub calendar: PathBuf,
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            tasks: PathBuf::from("tasks.json"),
            template: PathBuf::from("templates/standard.csv"),
            hot_template: None,
            calendar: PathBuf::from("calendar.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSection {
    pub enabled: bool,
    pub endpoint: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Local readings used instead of the HTTP endpoint.
    pub readings_file: Option<PathBuf>,
}

impl Default for WeatherSection {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://data.hub.api.metoffice.gov.uk/sitespecific/v0/point/hourly".to_string(),
            latitude: 51.5072,
            longitude: -0.1276,
            api_key_env: "CADENCE_WEATHER_API_KEY".to_string(),
            readings_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(ensure_cadence_home()?.join("config.toml")),
    }
}

/// Directory relative source paths are resolved against.
pub fn config_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    ensure_dir(&config_dir(path))?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Write the default config unless one exists. Returns true when a file was written.
pub fn init_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(path, &Config::default())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.scheduler.horizon_days, 28);
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.weather.enabled);
    }

    #[test]
    fn test_init_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("config.toml");
        assert!(init_config(&p).unwrap());
        assert!(!init_config(&p).unwrap());
        let cfg = load_config(&p).unwrap();
        assert_eq!(cfg.scheduler.timezone, "Europe/London");
        assert_eq!(cfg.sources.calendar, PathBuf::from("calendar.json"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(
            &p,
            "[scheduler]\ntimezone = \"America/Chicago\"\n\n[scheduler.weights]\nimpact = 0.5\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();
        let cfg = load_config(&p).unwrap();
        assert_eq!(cfg.scheduler.timezone, "America/Chicago");
        assert_eq!(cfg.scheduler.weights.impact, 0.5);
        assert_eq!(cfg.scheduler.weights.energy, 0.4);
        assert_eq!(cfg.scheduler.horizon_days, 28);
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn test_bad_toml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.toml");
        fs::write(&p, "[scheduler\n").unwrap();
        let err = load_config(&p).unwrap_err();
        assert!(format!("{err}").contains("config.toml"));
    }
}

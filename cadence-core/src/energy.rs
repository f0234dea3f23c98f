//! Energy profile: a weekly availability template expanded onto concrete dates.
//!
//! Template rows are `(weekday, "HH:MM - HH:MM", category, raw energy 1-10, scope)`.
//! Each row is replicated onto every matching date of the horizon. Malformed rows
//! are dropped and reported; they never abort the expansion.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigurationError;
use crate::interval::Interval;
use crate::task::{Category, EnergyLevel, Scope, Task};
use crate::time::{local_to_utc, start_of_local_day};

/// Buckets for the raw 1-10 energy scale: `1..medium_from` is low,
/// `medium_from..high_from` is medium, `high_from..=10` is high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyThresholds {
    pub medium_from: u8,
    pub high_from: u8,
}

impl Default for EnergyThresholds {
    fn default() -> Self {
        Self {
            medium_from: 4,
            high_from: 7,
        }
    }
}

impl EnergyThresholds {
    pub fn bucket(&self, raw: u8) -> Option<EnergyLevel> {
        match raw {
            0 => None,
            r if r < self.medium_from => Some(EnergyLevel::Low),
            r if r < self.high_from => Some(EnergyLevel::Medium),
            r if r <= 10 => Some(EnergyLevel::High),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.medium_from <= 1 || self.high_from <= self.medium_from || self.high_from > 10 {
            return Err(ConfigurationError::InvalidThresholds {
                medium_from: self.medium_from,
                high_from: self.high_from,
            });
        }
        Ok(())
    }
}

/// Which weekly template a run uses. Chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateVariant {
    Standard,
    HotWeather,
}

impl fmt::Display for TemplateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TemplateVariant::Standard => "standard",
            TemplateVariant::HotWeather => "hot_weather",
        })
    }
}

/// One row of the weekly template, as the external store hands it over.
///
/// Fields stay textual; validation happens during expansion so bad rows can be
/// reported instead of failing the fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRow {
    pub weekday: String,
    /// "HH:MM - HH:MM"
    pub time_range: String,
    /// Empty (or "any") means the window accepts every category.
    pub category: String,
    /// 1-10
    pub raw_energy: String,
    pub scope: String,
}

impl TemplateRow {
    pub fn new(
        weekday: impl Into<String>,
        time_range: impl Into<String>,
        category: impl Into<String>,
        raw_energy: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            weekday: weekday.into(),
            time_range: time_range.into(),
            category: category.into(),
            raw_energy: raw_energy.into(),
            scope: scope.into(),
        }
    }
}

/// A labelled `[start, end)` availability window on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyWindow {
    pub interval: Interval,
    pub energy: EnergyLevel,
    pub scope: Scope,
    pub category: Option<Category>,
}

impl EnergyWindow {
    /// Energy at least the task's requirement, same scope, and either an
    /// unreserved window or one reserved for the task's category.
    pub fn accepts(&self, task: &Task) -> bool {
        self.energy >= task.energy
            && self.scope == task.scope
            && match self.category {
                None => true,
                Some(c) => task.category == Some(c),
            }
    }
}

/// A template row that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedRow {
    /// 1-based position in the template.
    pub row: usize,
    pub reason: String,
}

impl fmt::Display for DroppedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template row {}: {}", self.row, self.reason)
    }
}

/// Availability per local date over a fixed horizon starting today.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyProfile {
    tz: Tz,
    today: NaiveDate,
    horizon_days: u32,
    days: BTreeMap<NaiveDate, Vec<EnergyWindow>>,
}

#[derive(Debug, Clone, Copy)]
struct ParsedRow {
    weekday: Weekday,
    start: NaiveTime,
    end: NaiveTime,
    energy: EnergyLevel,
    scope: Scope,
    category: Option<Category>,
}

impl EnergyProfile {
    /// Expand `rows` onto `horizon_days` dates starting at `today`.
    pub fn from_template(
        rows: &[TemplateRow],
        today: NaiveDate,
        horizon_days: u32,
        tz: Tz,
        thresholds: &EnergyThresholds,
    ) -> (Self, Vec<DroppedRow>) {
        let mut profile = Self {
            tz,
            today,
            horizon_days,
            days: BTreeMap::new(),
        };
        let mut dropped = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            let n = idx + 1;
            let parsed = match parse_row(row, thresholds) {
                Ok(p) => p,
                Err(reason) => {
                    dropped.push(DroppedRow { row: n, reason });
                    continue;
                }
            };

            // The day before the horizon contributes the after-midnight half of overnight rows.
            let spill = today - Duration::days(1);
            let dates = std::iter::once(spill).chain(horizon_dates(today, horizon_days));
            for date in dates.filter(|d| d.weekday() == parsed.weekday) {
                if date == spill && parsed.end > parsed.start {
                    continue;
                }
                if let Err(reason) = profile.place_row(&parsed, date) {
                    dropped.push(DroppedRow {
                        row: n,
                        reason: format!("{date}: {reason}"),
                    });
                }
            }
        }

        for windows in profile.days.values_mut() {
            windows.sort_by_key(|w| w.interval.start);
        }

        (profile, dropped)
    }

    /// Replicate one row onto `date`, splitting overnight ranges at local midnight.
    /// Only the parts that fall on horizon dates are kept.
    fn place_row(&mut self, row: &ParsedRow, date: NaiveDate) -> Result<(), String> {
        let tz = self.tz;
        let zone = tz.name();

        if row.end > row.start {
            let start = local_to_utc(tz, date, row.start)
                .ok_or_else(|| format!("{} does not exist in {zone}", row.start))?;
            let end = local_to_utc(tz, date, row.end)
                .ok_or_else(|| format!("{} does not exist in {zone}", row.end))?;
            self.push(date, Interval::new(start, end), row);
            return Ok(());
        }

        // Overnight: [start, midnight) today, [midnight, end) tomorrow.
        let next = date + Duration::days(1);
        let midnight = start_of_local_day(tz, next)
            .ok_or_else(|| format!("midnight of {next} does not exist in {zone}"))?;
        if self.in_horizon(date) {
            let start = local_to_utc(tz, date, row.start)
                .ok_or_else(|| format!("{} does not exist in {zone}", row.start))?;
            self.push(date, Interval::new(start, midnight), row);
        }

        if row.end > NaiveTime::MIN && self.in_horizon(next) {
            let end = local_to_utc(tz, next, row.end)
                .ok_or_else(|| format!("{} does not exist in {zone}", row.end))?;
            self.push(next, Interval::new(midnight, end), row);
        }
        Ok(())
    }

    fn push(&mut self, date: NaiveDate, interval: Interval, row: &ParsedRow) {
        if interval.is_empty() {
            return;
        }
        self.days.entry(date).or_default().push(EnergyWindow {
            interval,
            energy: row.energy,
            scope: row.scope,
            category: row.category,
        });
    }

    fn in_horizon(&self, date: NaiveDate) -> bool {
        date >= self.today && date < self.today + Duration::days(i64::from(self.horizon_days))
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    /// `[start of today, start of today + horizon)` in UTC.
    pub fn horizon(&self) -> Option<Interval> {
        let start = start_of_local_day(self.tz, self.today)?;
        let end = start_of_local_day(self.tz, self.today + Duration::days(i64::from(self.horizon_days)))?;
        Some(Interval::new(start, end))
    }

    pub fn is_empty(&self) -> bool {
        self.days.values().all(|w| w.is_empty())
    }

    pub fn window_count(&self) -> usize {
        self.days.values().map(|w| w.len()).sum()
    }

    /// Dates that carry at least one window, in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn windows_on(&self, date: NaiveDate) -> &[EnergyWindow] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[EnergyWindow])> + '_ {
        self.days.iter().map(|(d, w)| (*d, w.as_slice()))
    }
}

fn horizon_dates(today: NaiveDate, horizon_days: u32) -> impl Iterator<Item = NaiveDate> {
    (0..i64::from(horizon_days)).map(move |i| today + Duration::days(i))
}

fn parse_row(row: &TemplateRow, thresholds: &EnergyThresholds) -> Result<ParsedRow, String> {
    let weekday = parse_weekday(&row.weekday)
        .ok_or_else(|| format!("unrecognised weekday '{}'", row.weekday.trim()))?;
    let (start, end) = parse_time_range(&row.time_range)
        .ok_or_else(|| format!("malformed time range '{}'", row.time_range.trim()))?;
    let raw: u8 = row
        .raw_energy
        .trim()
        .parse()
        .map_err(|_| format!("energy '{}' is not a number", row.raw_energy.trim()))?;
    let energy = thresholds
        .bucket(raw)
        .ok_or_else(|| format!("energy {raw} is outside 1-10"))?;
    let scope = Scope::parse(&row.scope).ok_or_else(|| format!("unknown scope '{}'", row.scope.trim()))?;
    let category = match row.category.trim() {
        "" | "-" => None,
        c if c.eq_ignore_ascii_case("any") => None,
        c => Some(Category::parse(c).ok_or_else(|| format!("unknown category '{c}'"))?),
    };

    Ok(ParsedRow {
        weekday,
        start,
        end,
        energy,
        scope,
        category,
    })
}

/// Full English weekday names or their three-letter abbreviations, any case.
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    let s = s.trim().to_lowercase();
    let day = match s.as_str() {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" | "tues" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" | "thurs" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Parse "HH:MM - HH:MM". An end of "24:00" means midnight.
pub fn parse_time_range(s: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (a, b) = s.split_once('-')?;
    let start = NaiveTime::parse_from_str(a.trim(), "%H:%M").ok()?;
    let end = match b.trim() {
        "24:00" => NaiveTime::MIN,
        other => NaiveTime::parse_from_str(other, "%H:%M").ok()?,
    };
    Some((start, end))
}

//! Task model for the scheduling engine.
//!
//! A task is immutable for the duration of a run; scores and placements are
//! computed from it, never written back into it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cognitive capacity a task needs or a window offers. Ordered low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    /// 1 = low, 2 = medium, 3 = high.
    pub fn value(self) -> u8 {
        match self {
            EnergyLevel::Low => 1,
            EnergyLevel::Medium => 2,
            EnergyLevel::High => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(EnergyLevel::Low),
            "medium" => Some(EnergyLevel::Medium),
            "high" => Some(EnergyLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for EnergyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EnergyLevel::Low => "low",
            EnergyLevel::Medium => "medium",
            EnergyLevel::High => "high",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Impact {
    /// 1..=4 for low..very-high.
    pub fn value(self) -> u8 {
        match self {
            Impact::Low => 1,
            Impact::Medium => 2,
            Impact::High => 3,
            Impact::VeryHigh => 4,
        }
    }
}

/// Work classification. Windows may be reserved for one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Email,
    Admin,
    Writing,
    DataAnalysis,
    ReadingSearching,
    ThinkingPlanning,
    GivingTalks,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Email,
        Category::Admin,
        Category::Writing,
        Category::DataAnalysis,
        Category::ReadingSearching,
        Category::ThinkingPlanning,
        Category::GivingTalks,
    ];

    /// Stable label used in task-tracker labels and config keys.
    pub fn label(self) -> &'static str {
        match self {
            Category::Email => "emails",
            Category::Admin => "admin",
            Category::Writing => "writing",
            Category::DataAnalysis => "data_analysis",
            Category::ReadingSearching => "reading_searching",
            Category::ThinkingPlanning => "thinking_planning",
            Category::GivingTalks => "giving_talks",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Category::Email => "email",
            Category::Admin => "admin",
            Category::Writing => "writing",
            Category::DataAnalysis => "data analysis",
            Category::ReadingSearching => "reading & searching",
            Category::ThinkingPlanning => "thinking & planning",
            Category::GivingTalks => "preparing & giving talks",
        }
    }

    /// Accepts either the label or the display name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s || c.display_name() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Work,
    Personal,
}

impl Scope {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "work" => Some(Scope::Work),
            "personal" => Some(Scope::Personal),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Work => "work",
            Scope::Personal => "personal",
        })
    }
}

/// Core task type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Externally assigned, stable across runs.
    pub id: String,
    pub name: String,

    /// Minutes, > 0.
    pub duration_minutes: u32,

    pub energy: EnergyLevel,
    pub impact: Impact,
    pub category: Option<Category>,
    pub scope: Scope,

    /// Optional hard deadline (UTC). `None` means no deadline.
    pub deadline: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_minutes: 60,
            energy: EnergyLevel::Medium,
            impact: Impact::Low,
            category: None,
            scope: Scope::Work,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_energy(mut self, energy: EnergyLevel) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_impact(mut self, impact: Impact) -> Self {
        self.impact = impact;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Basic invariants checked before a task enters a run.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must be non-empty".to_string());
        }
        if self.duration_minutes == 0 {
            return Err(format!("task '{}' has a zero duration estimate", self.id));
        }
        Ok(())
    }
}

//! Task Scorer: task attributes plus "now" to a single priority number.
//!
//! score = wT * (duration / max_duration) + wE * (energy / 3) + wI * impact + wD * urgency
//!
//! Scores are recomputed every run and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub time: f64,
    pub energy: f64,
    pub impact: f64,
    pub deadline: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            time: 0.2,
            energy: 0.4,
            impact: 0.3,
            deadline: 0.1,
        }
    }
}

impl Weights {
    /// Weights need not sum to 1, but each must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("time", self.time),
            ("energy", self.energy),
            ("impact", self.impact),
            ("deadline", self.deadline),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidWeight { name, value });
            }
        }
        Ok(())
    }
}

/// Urgency contribution of a deadline.
///
/// No deadline is 0. A deadline strictly before `now` is `overdue`, however far
/// past. Otherwise `1 / (whole days until deadline + 1)`, so a deadline at
/// exactly `now` gives 1.0.
pub fn deadline_urgency(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>, overdue: f64) -> f64 {
    match deadline {
        None => 0.0,
        Some(d) if d < now => overdue,
        Some(d) => {
            let days = (d - now).num_days();
            1.0 / (days as f64 + 1.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTask {
    pub task: Task,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskScorer {
    weights: Weights,
    max_duration_minutes: u32,
    overdue_urgency: f64,
}

impl Default for TaskScorer {
    fn default() -> Self {
        Self::new(Weights::default(), 480, 2.0)
    }
}

impl TaskScorer {
    pub fn new(weights: Weights, max_duration_minutes: u32, overdue_urgency: f64) -> Self {
        Self {
            weights,
            max_duration_minutes,
            overdue_urgency,
        }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn score(&self, task: &Task, now: DateTime<Utc>) -> f64 {
        let w = &self.weights;
        let time = f64::from(task.duration_minutes) / f64::from(self.max_duration_minutes.max(1));
        let energy = f64::from(task.energy.value()) / 3.0;
        let impact = f64::from(task.impact.value());
        let urgency = deadline_urgency(task.deadline, now, self.overdue_urgency);

        w.time * time + w.energy * energy + w.impact * impact + w.deadline * urgency
    }

    /// Highest score first. Equal scores keep input order.
    pub fn rank(&self, tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<ScoredTask> {
        let mut scored: Vec<ScoredTask> = tasks
            .into_iter()
            .map(|task| {
                let score = self.score(&task, now);
                ScoredTask { task, score }
            })
            .collect();
        // sort_by is stable, so ties stay first-seen.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{EnergyLevel, Impact};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn urgency_edges() {
        let n = now();
        assert_eq!(deadline_urgency(None, n, 2.0), 0.0);
        assert_eq!(deadline_urgency(Some(n), n, 2.0), 1.0);
        assert_eq!(deadline_urgency(Some(n - Duration::days(1)), n, 2.0), 2.0);
        assert_eq!(deadline_urgency(Some(n - Duration::days(40)), n, 2.0), 2.0);
        assert_eq!(deadline_urgency(Some(n - Duration::seconds(1)), n, 2.0), 2.0);
        assert!(approx(deadline_urgency(Some(n + Duration::days(3)), n, 2.0), 0.25));
        // Partial days round down.
        assert!(approx(deadline_urgency(Some(n + Duration::hours(30)), n, 2.0), 0.5));
    }

    #[test]
    fn score_matches_formula() {
        let scorer = TaskScorer::default();
        let t = Task::new("t1", "write report")
            .with_duration(240)
            .with_energy(EnergyLevel::High)
            .with_impact(Impact::VeryHigh)
            .with_deadline(now() + Duration::days(1));
        // 0.2*0.5 + 0.4*1 + 0.3*4 + 0.1*0.5
        assert!(approx(scorer.score(&t, now()), 0.1 + 0.4 + 1.2 + 0.05));
    }

    #[test]
    fn rank_is_descending_and_stable() {
        let scorer = TaskScorer::default();
        let tasks = vec![
            Task::new("a", "same"),
            Task::new("b", "bigger").with_impact(Impact::High),
            Task::new("c", "same"),
        ];
        let ranked = scorer.rank(tasks, now());
        let ids: Vec<_> = ranked.iter().map(|s| s.task.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(ranked[0].score > ranked[1].score);
        assert_eq!(ranked[1].score, ranked[2].score);
    }

    #[test]
    fn overdue_outranks_far_deadline() {
        let scorer = TaskScorer::default();
        let late = Task::new("late", "late").with_deadline(now() - Duration::days(10));
        let far = Task::new("far", "far").with_deadline(now() + Duration::days(20));
        assert!(scorer.score(&late, now()) > scorer.score(&far, now()));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let w = Weights { energy: -0.1, ..Weights::default() };
        assert_eq!(
            w.validate(),
            Err(ConfigurationError::InvalidWeight { name: "energy", value: -0.1 })
        );
        assert!(Weights { impact: f64::NAN, ..Weights::default() }.validate().is_err());
        assert!(Weights::default().validate().is_ok());
    }
}

//! Scheduler Kernel: orchestration of one scheduling run.
//!
//! The kernel owns the collaborators (task source, template source, calendar,
//! weather) and the run configuration, and drives the stages in order:
//! weather -> template -> energy profile -> tasks -> occupied set -> rank ->
//! allocate -> (optionally) reconcile.
//!
//! `now` is always passed in; nothing below this module reads the clock.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::allocator::{Allocation, GreedyAllocator, Unscheduled};
use crate::buffers::CalendarCommitment;
use crate::config::SchedulerConfig;
use crate::energy::{EnergyProfile, TemplateRow, TemplateVariant};
use crate::error::{ConfigurationError, Issue, PlanError, RetrievalError, Stage};
use crate::interval::Interval;
use crate::occupied::OccupiedSet;
use crate::reconcile::{apply_reconciliation, plan_reconciliation, AllocationStore, ReconcileAction, ReconcileReport};
use crate::scorer::ScoredTask;
use crate::slots::{DaySlots, SlotResolver};
use crate::task::Task;
use crate::time::local_date;
use crate::weather::variant_for;

/// Source of the tasks to schedule.
pub trait TaskSource {
    /// An empty list is a legitimate answer; `Err` means the source was unreachable.
    fn fetch_tasks(&self) -> Result<Vec<Task>, RetrievalError>;
}

/// Source of the weekly availability template.
pub trait TemplateSource {
    fn fetch_weekly_template(&self, variant: TemplateVariant) -> Result<Vec<TemplateRow>, RetrievalError>;
}

/// Existing calendar commitments, excluding events the engine created itself.
pub trait CalendarSource {
    fn fetch_commitments(&self, horizon: Interval) -> Result<Vec<CalendarCommitment>, RetrievalError>;
}

/// Binary hot-weather signal.
pub trait WeatherSignal {
    fn is_hot_weather(&self) -> Result<bool, RetrievalError>;
}

/// A weather signal with a fixed answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWeather(pub bool);

impl WeatherSignal for FixedWeather {
    fn is_hot_weather(&self) -> Result<bool, RetrievalError> {
        Ok(self.0)
    }
}

/// Outcome of a planning run. Nothing here has been persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub now: DateTime<Utc>,
    pub variant: TemplateVariant,
    #[serde(skip)]
    pub profile: EnergyProfile,
    /// All valid tasks, highest score first.
    pub ranked: Vec<ScoredTask>,
    /// Merged allocations, grouped by task in rank order.
    pub allocations: Vec<Allocation>,
    pub unscheduled: Vec<Unscheduled>,
    #[serde(skip)]
    pub occupied: OccupiedSet,
    pub issues: Vec<Issue>,
}

impl Plan {
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.ranked.iter().map(|s| &s.task).find(|t| t.id == task_id)
    }

    pub fn allocations_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a Allocation> + 'a {
        self.allocations.iter().filter(move |a| a.task_id == task_id)
    }

    /// Placed as more than one block.
    pub fn is_split(&self, task_id: &str) -> bool {
        self.allocations_for(task_id).nth(1).is_some()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.ranked.iter().map(|s| s.task.clone()).collect()
    }
}

/// A plan plus what happened when it was reconciled with the store.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub plan: Plan,
    pub actions: Vec<ReconcileAction>,
    /// `None` when persisted allocations could not be read and writing was skipped.
    pub reconcile: Option<ReconcileReport>,
}

/// Everything the allocator needs, before any task is placed.
struct Prepared {
    variant: TemplateVariant,
    profile: EnergyProfile,
    tasks: Vec<Task>,
    occupied: OccupiedSet,
    issues: Vec<Issue>,
}

pub struct SchedulerKernel<T: TaskSource, P: TemplateSource, C: CalendarSource, W: WeatherSignal> {
    config: SchedulerConfig,
    tasks: T,
    templates: P,
    calendar: C,
    weather: W,
}

impl<T: TaskSource, P: TemplateSource, C: CalendarSource, W: WeatherSignal> SchedulerKernel<T, P, C, W> {
    pub fn new(config: SchedulerConfig, tasks: T, templates: P, calendar: C, weather: W) -> Self {
        Self {
            config,
            tasks,
            templates,
            calendar,
            weather,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Compute allocations without writing anything.
    pub fn plan(&self, now: DateTime<Utc>) -> Result<Plan, PlanError> {
        let prepared = self.prepare(now)?;
        let Prepared {
            variant,
            profile,
            tasks,
            mut occupied,
            issues,
        } = prepared;

        let ranked = self.config.scorer().rank(tasks, now);
        info!(tasks = ranked.len(), "tasks ranked");

        let allocator = GreedyAllocator::new(SlotResolver::new(self.config.chunking));
        let outcome = allocator.allocate(&ranked, &profile, &mut occupied, now);
        info!(
            allocations = outcome.allocations.len(),
            unscheduled = outcome.unscheduled.len(),
            "allocation finished"
        );

        Ok(Plan {
            now,
            variant,
            profile,
            ranked,
            allocations: outcome.allocations,
            unscheduled: outcome.unscheduled,
            occupied,
            issues,
        })
    }

    /// Plan, then reconcile against `store`.
    ///
    /// When prior allocations cannot be read nothing is written, so a rerun
    /// never duplicates events it could not see.
    pub fn run<S: AllocationStore + ?Sized>(&self, store: &mut S, now: DateTime<Utc>) -> Result<RunReport, PlanError> {
        let mut plan = self.plan(now)?;
        let horizon = plan
            .profile
            .horizon()
            .unwrap_or_else(|| fallback_horizon(now, self.config.horizon_days));

        let previous = match store.fetch_persisted(horizon) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not read persisted allocations; skipping writes");
                plan.issues.push(Issue::new(
                    Stage::Persistence,
                    format!("persisted allocations unavailable, nothing written: {e}"),
                ));
                return Ok(RunReport {
                    plan,
                    actions: Vec::new(),
                    reconcile: None,
                });
            }
        };

        let actions = plan_reconciliation(&plan.allocations, &previous);
        let report = apply_reconciliation(store, &actions, &plan.tasks(), &self.config);
        for failure in &report.failures {
            plan.issues.push(Issue::new(Stage::Persistence, failure.to_string()));
        }

        Ok(RunReport {
            plan,
            actions,
            reconcile: Some(report),
        })
    }

    /// Candidate slots for one task against the initial occupied set, before
    /// any other task is placed. `None` when the task is not in this run.
    pub fn slots_for(&self, task_id: &str, now: DateTime<Utc>) -> Result<Option<Vec<DaySlots>>, PlanError> {
        let prepared = self.prepare(now)?;
        let Some(task) = prepared.tasks.iter().find(|t| t.id == task_id) else {
            return Ok(None);
        };
        let resolver = SlotResolver::new(self.config.chunking);
        Ok(Some(resolver.resolve(task, &prepared.profile, &prepared.occupied, now)))
    }

    fn prepare(&self, now: DateTime<Utc>) -> Result<Prepared, PlanError> {
        let tz = self.config.validate()?;
        let mut issues = Vec::new();

        let hot = match self.weather.is_hot_weather() {
            Ok(hot) => hot,
            Err(e) => {
                warn!(error = %e, "weather lookup failed; using standard template");
                issues.push(Issue::new(Stage::Weather, format!("{e}; assuming not hot")));
                false
            }
        };
        let variant = variant_for(hot);
        info!(%variant, "template variant selected");

        let profile = self.build_profile(variant, tz, now, &mut issues)?;
        let tasks = self.load_tasks(&mut issues)?;
        let occupied = self.build_occupied(&profile, tz, now, &mut issues);

        Ok(Prepared {
            variant,
            profile,
            tasks,
            occupied,
            issues,
        })
    }

    fn build_profile(
        &self,
        variant: TemplateVariant,
        tz: Tz,
        now: DateTime<Utc>,
        issues: &mut Vec<Issue>,
    ) -> Result<EnergyProfile, PlanError> {
        let rows = self
            .templates
            .fetch_weekly_template(variant)
            .map_err(|source| PlanError::Retrieval {
                stage: Stage::Template,
                source,
            })?;
        if rows.is_empty() {
            return Err(ConfigurationError::EmptyTemplate {
                variant: variant.to_string(),
            }
            .into());
        }

        let today = local_date(tz, now);
        let (profile, dropped) =
            EnergyProfile::from_template(&rows, today, self.config.horizon_days, tz, &self.config.energy_thresholds);
        for d in dropped {
            warn!(row = d.row, reason = %d.reason, "template row dropped");
            issues.push(Issue::new(Stage::Template, d.to_string()));
        }
        if profile.is_empty() {
            return Err(ConfigurationError::EmptyProfile.into());
        }
        info!(windows = profile.window_count(), %today, "energy profile built");
        Ok(profile)
    }

    fn load_tasks(&self, issues: &mut Vec<Issue>) -> Result<Vec<Task>, PlanError> {
        let fetched = self.tasks.fetch_tasks().map_err(|source| PlanError::Retrieval {
            stage: Stage::Tasks,
            source,
        })?;

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(fetched.len());
        for task in fetched {
            if let Err(reason) = task.validate() {
                warn!(task_id = %task.id, %reason, "task skipped");
                issues.push(Issue::new(Stage::Tasks, format!("skipped: {reason}")));
                continue;
            }
            if !seen.insert(task.id.clone()) {
                warn!(task_id = %task.id, "duplicate task id skipped");
                issues.push(Issue::new(Stage::Tasks, format!("duplicate task id '{}' skipped", task.id)));
                continue;
            }
            tasks.push(task);
        }
        info!(tasks = tasks.len(), "tasks loaded");
        Ok(tasks)
    }

    fn build_occupied(
        &self,
        profile: &EnergyProfile,
        tz: Tz,
        now: DateTime<Utc>,
        issues: &mut Vec<Issue>,
    ) -> OccupiedSet {
        let horizon = profile
            .horizon()
            .unwrap_or_else(|| fallback_horizon(now, self.config.horizon_days));
        let mut occupied = OccupiedSet::new();

        match self.calendar.fetch_commitments(horizon) {
            Ok(commitments) => {
                for c in &commitments {
                    occupied.insert(c.as_occupied());
                    occupied.extend(self.config.buffers.buffers_for(c));
                }
                info!(commitments = commitments.len(), occupied = occupied.len(), "calendar loaded");
            }
            Err(e) => {
                warn!(error = %e, "calendar unavailable; treating as no commitments");
                issues.push(Issue::new(
                    Stage::Calendar,
                    format!("{e}; scheduling as if there were no commitments"),
                ));
            }
        }

        if self.config.breaks.enabled {
            let dates: Vec<_> = profile.dates().collect();
            for date in dates {
                let breaks = self.config.breaks.breaks_for(date, tz, &occupied);
                occupied.extend(breaks);
            }
            debug!(occupied = occupied.len(), "breaks inserted");
        }

        occupied
    }
}

fn fallback_horizon(now: DateTime<Utc>, days: u32) -> Interval {
    Interval::new(now, now + Duration::days(i64::from(days)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::reconcile::{AllocationMetadata, PersistedAllocation};
    use chrono::TimeZone;
    use std::cell::RefCell;

    struct Tasks(Result<Vec<Task>, RetrievalError>);
    impl TaskSource for Tasks {
        fn fetch_tasks(&self) -> Result<Vec<Task>, RetrievalError> {
            self.0.clone()
        }
    }

    struct Templates {
        standard: Vec<TemplateRow>,
        hot: Vec<TemplateRow>,
        asked: RefCell<Vec<TemplateVariant>>,
    }
    impl TemplateSource for Templates {
        fn fetch_weekly_template(&self, variant: TemplateVariant) -> Result<Vec<TemplateRow>, RetrievalError> {
            self.asked.borrow_mut().push(variant);
            Ok(match variant {
                TemplateVariant::Standard => self.standard.clone(),
                TemplateVariant::HotWeather => self.hot.clone(),
            })
        }
    }

    struct Calendar(Result<Vec<CalendarCommitment>, RetrievalError>);
    impl CalendarSource for Calendar {
        fn fetch_commitments(&self, _horizon: Interval) -> Result<Vec<CalendarCommitment>, RetrievalError> {
            self.0.clone()
        }
    }

    struct BrokenWeather;
    impl WeatherSignal for BrokenWeather {
        fn is_hot_weather(&self) -> Result<bool, RetrievalError> {
            Err(RetrievalError::new("forecast", "timed out"))
        }
    }

    struct UnreadableStore;
    impl AllocationStore for UnreadableStore {
        fn fetch_persisted(&mut self, _horizon: Interval) -> Result<Vec<PersistedAllocation>, RetrievalError> {
            Err(RetrievalError::new("calendar", "offline"))
        }
        fn commit_allocation(
            &mut self,
            task_id: &str,
            _interval: Interval,
            _metadata: &AllocationMetadata,
        ) -> Result<String, PersistenceError> {
            Err(PersistenceError::new(task_id, "should not be called"))
        }
        fn update_allocation(&mut self, event_id: &str, _interval: Interval) -> Result<(), PersistenceError> {
            Err(PersistenceError::new(event_id, "should not be called"))
        }
    }

    fn now() -> DateTime<Utc> {
        // Monday 2 March 2026, 08:00 GMT.
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn templates() -> Templates {
        Templates {
            standard: vec![TemplateRow::new("Monday", "09:00 - 12:00", "", "8", "work")],
            hot: vec![TemplateRow::new("Monday", "07:00 - 10:00", "", "8", "work")],
            asked: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn hot_weather_selects_alternate_template_once() {
        let kernel = SchedulerKernel::new(
            SchedulerConfig::default(),
            Tasks(Ok(vec![Task::new("t1", "report")])),
            templates(),
            Calendar(Ok(vec![])),
            FixedWeather(true),
        );
        let plan = kernel.plan(now()).unwrap();
        assert_eq!(plan.variant, TemplateVariant::HotWeather);
        assert_eq!(kernel.templates.asked.borrow().as_slice(), &[TemplateVariant::HotWeather]);
        assert_eq!(
            plan.allocations[0].interval,
            Interval::new(now(), now() + Duration::minutes(60))
        );
    }

    #[test]
    fn weather_failure_falls_back_to_standard() {
        let kernel = SchedulerKernel::new(
            SchedulerConfig::default(),
            Tasks(Ok(vec![])),
            templates(),
            Calendar(Ok(vec![])),
            BrokenWeather,
        );
        let plan = kernel.plan(now()).unwrap();
        assert_eq!(plan.variant, TemplateVariant::Standard);
        assert!(plan.issues.iter().any(|i| i.stage == Stage::Weather));
        assert!(plan.allocations.is_empty());
    }

    #[test]
    fn task_retrieval_failure_is_fatal_with_stage() {
        let kernel = SchedulerKernel::new(
            SchedulerConfig::default(),
            Tasks(Err(RetrievalError::new("todo export", "permission denied"))),
            templates(),
            Calendar(Ok(vec![])),
            FixedWeather(false),
        );
        let err = kernel.plan(now()).unwrap_err();
        assert_eq!(err.stage(), Stage::Tasks);
    }

    #[test]
    fn empty_template_is_a_configuration_error() {
        let kernel = SchedulerKernel::new(
            SchedulerConfig::default(),
            Tasks(Ok(vec![])),
            Templates {
                standard: vec![],
                hot: vec![],
                asked: RefCell::new(Vec::new()),
            },
            Calendar(Ok(vec![])),
            FixedWeather(false),
        );
        assert!(matches!(
            kernel.plan(now()),
            Err(PlanError::Configuration(ConfigurationError::EmptyTemplate { .. }))
        ));
    }

    #[test]
    fn calendar_failure_degrades_to_no_commitments() {
        let kernel = SchedulerKernel::new(
            SchedulerConfig::default(),
            Tasks(Ok(vec![Task::new("t1", "report")])),
            templates(),
            Calendar(Err(RetrievalError::new("calendar", "503"))),
            FixedWeather(false),
        );
        let plan = kernel.plan(now()).unwrap();
        assert!(plan.issues.iter().any(|i| i.stage == Stage::Calendar));
        assert_eq!(plan.allocations.len(), 1);
    }

    #[test]
    fn invalid_and_duplicate_tasks_are_dropped_with_issues() {
        let kernel = SchedulerKernel::new(
            SchedulerConfig::default(),
            Tasks(Ok(vec![
                Task::new("t1", "report"),
                Task::new("t1", "report again"),
                Task::new("t2", "empty").with_duration(0),
            ])),
            templates(),
            Calendar(Ok(vec![])),
            FixedWeather(false),
        );
        let plan = kernel.plan(now()).unwrap();
        assert_eq!(plan.ranked.len(), 1);
        assert_eq!(plan.issues.iter().filter(|i| i.stage == Stage::Tasks).count(), 2);
    }

    #[test]
    fn unreadable_store_skips_writes() {
        let kernel = SchedulerKernel::new(
            SchedulerConfig::default(),
            Tasks(Ok(vec![Task::new("t1", "report")])),
            templates(),
            Calendar(Ok(vec![])),
            FixedWeather(false),
        );
        let report = kernel.run(&mut UnreadableStore, now()).unwrap();
        assert!(report.reconcile.is_none());
        assert!(report.actions.is_empty());
        assert!(report.plan.issues.iter().any(|i| i.stage == Stage::Persistence));
    }

    #[test]
    fn commitments_and_travel_block_time() {
        let meeting = CalendarCommitment::new(
            "evt1",
            "Client visit",
            Interval::new(
                Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
            ),
        )
        .with_location("Leeds office");
        let kernel = SchedulerKernel::new(
            SchedulerConfig::default(),
            Tasks(Ok(vec![Task::new("t1", "report")])),
            templates(),
            Calendar(Ok(vec![meeting])),
            FixedWeather(false),
        );
        let plan = kernel.plan(now()).unwrap();
        // 09:00-10:30 is taken by travel + meeting + travel.
        assert_eq!(
            plan.allocations[0].interval,
            Interval::new(
                Utc.with_ymd_and_hms(2026, 3, 2, 10, 30, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 2, 11, 30, 0).unwrap(),
            )
        );

        let slots = kernel.slots_for("t1", now()).unwrap().unwrap();
        assert_eq!(slots[0].slots.len(), 1);
        assert!(kernel.slots_for("missing", now()).unwrap().is_none());
    }
}

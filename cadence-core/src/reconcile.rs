//! Reconciliation of fresh allocations against what an earlier run persisted.
//!
//! Allocations are paired per task id: both sides are sorted by start and the
//! i-th fresh block pairs with the i-th persisted one. Equal pairs are
//! skipped, differing pairs updated, and extra fresh blocks created. Extra
//! persisted blocks are left alone; deleting them is the store's business.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::allocator::Allocation;
use crate::config::SchedulerConfig;
use crate::error::{PersistenceError, RetrievalError};
use crate::interval::Interval;
use crate::task::Task;

/// An engine-created calendar event found in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAllocation {
    pub event_id: String,
    pub task_id: String,
    pub interval: Interval,
}

/// What gets written alongside a new allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationMetadata {
    pub title: String,
    pub description: String,
    pub colour_id: Option<String>,
}

impl AllocationMetadata {
    /// Description is the marker followed by the task id, which is how later
    /// runs recognise their own events.
    pub fn for_task(task: &Task, config: &SchedulerConfig) -> Self {
        Self {
            title: task.name.clone(),
            description: format!("{}\n Task ID: {}", config.marker, task.id),
            colour_id: config.colour_for(task.category).map(str::to_string),
        }
    }
}

/// The write side of the external calendar.
pub trait AllocationStore {
    /// Engine-created allocations overlapping `horizon`.
    fn fetch_persisted(&mut self, horizon: Interval) -> Result<Vec<PersistedAllocation>, RetrievalError>;

    /// Returns the new event id.
    fn commit_allocation(
        &mut self,
        task_id: &str,
        interval: Interval,
        metadata: &AllocationMetadata,
    ) -> Result<String, PersistenceError>;

    fn update_allocation(&mut self, event_id: &str, interval: Interval) -> Result<(), PersistenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
    Skip {
        task_id: String,
        event_id: String,
        interval: Interval,
    },
    Update {
        task_id: String,
        event_id: String,
        from: Interval,
        to: Interval,
    },
    Create {
        task_id: String,
        interval: Interval,
    },
}

impl ReconcileAction {
    pub fn task_id(&self) -> &str {
        match self {
            ReconcileAction::Skip { task_id, .. }
            | ReconcileAction::Update { task_id, .. }
            | ReconcileAction::Create { task_id, .. } => task_id,
        }
    }
}

/// Decide create/update/skip for every fresh allocation. Pure.
pub fn plan_reconciliation(fresh: &[Allocation], previous: &[PersistedAllocation]) -> Vec<ReconcileAction> {
    let mut prev_by_task: BTreeMap<&str, Vec<&PersistedAllocation>> = BTreeMap::new();
    for p in previous {
        prev_by_task.entry(p.task_id.as_str()).or_default().push(p);
    }
    for group in prev_by_task.values_mut() {
        group.sort_by(|a, b| a.interval.start.cmp(&b.interval.start).then_with(|| a.event_id.cmp(&b.event_id)));
    }

    // Fresh groups keep first-seen task order.
    let mut order: Vec<&str> = Vec::new();
    let mut fresh_by_task: BTreeMap<&str, Vec<Interval>> = BTreeMap::new();
    for a in fresh {
        let group = fresh_by_task.entry(a.task_id.as_str()).or_default();
        if group.is_empty() {
            order.push(a.task_id.as_str());
        }
        group.push(a.interval);
    }

    let mut actions = Vec::new();
    for task_id in order {
        let mut blocks = fresh_by_task.remove(task_id).unwrap_or_default();
        blocks.sort();
        let prior = prev_by_task.get(task_id).map(Vec::as_slice).unwrap_or(&[]);

        for (i, interval) in blocks.into_iter().enumerate() {
            let action = match prior.get(i) {
                Some(p) if p.interval == interval => ReconcileAction::Skip {
                    task_id: task_id.to_string(),
                    event_id: p.event_id.clone(),
                    interval,
                },
                Some(p) => ReconcileAction::Update {
                    task_id: task_id.to_string(),
                    event_id: p.event_id.clone(),
                    from: p.interval,
                    to: interval,
                },
                None => ReconcileAction::Create {
                    task_id: task_id.to_string(),
                    interval,
                },
            };
            actions.push(action);
        }
    }
    actions
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// (task id, new event id)
    pub created: Vec<(String, String)>,
    /// (task id, event id)
    pub updated: Vec<(String, String)>,
    pub skipped: usize,
    pub failures: Vec<PersistenceError>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Execute `actions` against `store`. A failed write is recorded for its task
/// and the remaining actions still run.
pub fn apply_reconciliation<S: AllocationStore + ?Sized>(
    store: &mut S,
    actions: &[ReconcileAction],
    tasks: &[Task],
    config: &SchedulerConfig,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for action in actions {
        match action {
            ReconcileAction::Skip { .. } => report.skipped += 1,
            ReconcileAction::Update { task_id, event_id, to, .. } => {
                match store.update_allocation(event_id, *to) {
                    Ok(()) => report.updated.push((task_id.clone(), event_id.clone())),
                    Err(e) => {
                        // Stores only see the event id on update.
                        let e = PersistenceError::new(task_id.clone(), e.message);
                        warn!(task_id = %task_id, error = %e, "update failed");
                        report.failures.push(e);
                    }
                }
            }
            ReconcileAction::Create { task_id, interval } => {
                let Some(task) = tasks.iter().find(|t| &t.id == task_id) else {
                    report
                        .failures
                        .push(PersistenceError::new(task_id.clone(), "task is not part of this run"));
                    continue;
                };
                let metadata = AllocationMetadata::for_task(task, config);
                match store.commit_allocation(task_id, *interval, &metadata) {
                    Ok(event_id) => report.created.push((task_id.clone(), event_id)),
                    Err(e) => {
                        warn!(task_id = %task_id, error = %e, "commit failed");
                        report.failures.push(e);
                    }
                }
            }
        }
    }

    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        skipped = report.skipped,
        failed = report.failures.len(),
        "reconciliation applied"
    );
    report
}

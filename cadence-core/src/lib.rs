//! cadence-core: the energy-aware time-slot scheduling engine.

pub mod allocator;
pub mod buffers;
pub mod config;
pub mod energy;
pub mod error;
pub mod interval;
pub mod occupied;
pub mod reconcile;
pub mod scheduler_kernel;
pub mod scorer;
pub mod slots;
pub mod task;
pub mod time;
pub mod weather;

pub use allocator::{merge_fragments, Allocation, AllocationOutcome, GreedyAllocator, Placement, Unscheduled};
pub use buffers::{BreakPolicy, BufferPolicy, CalendarCommitment, FixedBreak, LunchPolicy};
pub use config::{SchedulerConfig, DEFAULT_MARKER};
pub use energy::{DroppedRow, EnergyProfile, EnergyThresholds, EnergyWindow, TemplateRow, TemplateVariant};
pub use error::{ConfigurationError, Issue, PersistenceError, PlanError, RetrievalError, Stage};
pub use interval::{chunk, merge, subtract, Interval};
pub use occupied::{Occupied, OccupiedKind, OccupiedSet};
pub use reconcile::{
    apply_reconciliation, plan_reconciliation, AllocationMetadata, AllocationStore, PersistedAllocation,
    ReconcileAction, ReconcileReport,
};
pub use scheduler_kernel::{
    CalendarSource, FixedWeather, Plan, RunReport, SchedulerKernel, TaskSource, TemplateSource, WeatherSignal,
};
pub use scorer::{deadline_urgency, ScoredTask, TaskScorer, Weights};
pub use slots::{ChunkPolicy, DaySlots, SlotResolver};
pub use task::{Category, EnergyLevel, Impact, Scope, Task};
pub use weather::{is_hot, WeatherPolicy, WeatherReading};

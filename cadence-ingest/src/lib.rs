//! cadence-ingest: parsers turning exported task, template and calendar data
//! into cadence-core types.

pub mod parsers;
pub mod types;

pub use parsers::calendar::{
    parse_calendar_events, parse_calendar_file, parse_calendar_json, task_id_from_description, CalendarIntake,
};
pub use parsers::tasks::{
    parse_tasks_file, parse_tasks_json, DurationExtractor, SkippedTask, TaskIntake,
};
pub use parsers::template::{parse_template_csv, parse_template_file};
pub use types::{RawCalendarEvent, RawDue, RawEventTime, RawTask};

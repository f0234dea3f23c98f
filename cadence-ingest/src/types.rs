//! Raw payload shapes as exported by the task tracker and the calendar.
//!
//! These mirror the external JSON closely; `parsers` turns them into core types.

use serde::{Deserialize, Serialize};

/// One task from the tracker export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTask {
    pub id: String,
    pub content: String,
    pub description: Option<String>,
    pub labels: Vec<String>,
    /// Comment bodies attached to the task.
    pub notes: Vec<String>,
    pub due: Option<RawDue>,
}

/// Due information: either a bare date or a full timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDue {
    /// "YYYY-MM-DD"
    pub date: Option<String>,
    /// RFC 3339, or naive local time.
    pub datetime: Option<String>,
}

/// Start or end of a calendar event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEventTime {
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// Set instead of `dateTime` for all-day events. The end date is exclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl RawEventTime {
    pub fn at(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            date: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCalendarEvent {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "colorId", default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    pub start: RawEventTime,
    pub end: RawEventTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_event_uses_external_field_names() {
        let json = r#"{"id":"e1","summary":"Standup","start":{"dateTime":"2026-03-02T09:00:00Z"},"end":{"date":"2026-03-03"},"colorId":"7"}"#;
        let ev: RawCalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(ev.start.date_time.as_deref(), Some("2026-03-02T09:00:00Z"));
        assert_eq!(ev.end.date.as_deref(), Some("2026-03-03"));
        assert_eq!(ev.color_id.as_deref(), Some("7"));

        let back = serde_json::to_string(&ev).unwrap();
        assert!(back.contains("\"dateTime\""));
        assert!(!back.contains("\"location\""));
    }

    #[test]
    fn raw_task_tolerates_missing_fields() {
        let t: RawTask = serde_json::from_str(r#"{"id":"42","content":"Write intro"}"#).unwrap();
        assert!(t.labels.is_empty());
        assert!(t.due.is_none());
    }
}

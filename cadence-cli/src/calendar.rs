use cadence_core::{AllocationMetadata, Plan, SchedulerConfig};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Round up to the next 15-minute boundary.
pub fn ceil_to_quarter_hour(dt: DateTime<Utc>) -> DateTime<Utc> {
    let quarter = TimeDelta::minutes(15);
    match dt.duration_trunc(quarter) {
        Ok(floor) if floor == dt => dt,
        Ok(floor) => floor + quarter,
        Err(_) => dt,
    }
}

/// Emit an ICS calendar with one VEVENT per allocation block.
///
/// DTSTART/DTEND are UTC. UIDs are derived from task id and start so a
/// re-import replaces rather than duplicates a block that did not move.
pub fn allocations_to_ics(plan: &Plan, config: &SchedulerConfig) -> String {
    let mut s = String::new();
    s.push_str("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Cadence//EN\r\n");

    for a in &plan.allocations {
        let Some(task) = plan.task(&a.task_id) else {
            continue;
        };
        let meta = AllocationMetadata::for_task(task, config);
        let dtstart = a.interval.start.format("%Y%m%dT%H%M%SZ");
        let dtend = a.interval.end.format("%Y%m%dT%H%M%SZ");

        s.push_str("BEGIN:VEVENT\r\n");
        s.push_str(&format!("UID:cadence-{}-{}@cadence\r\n", escape_ics(&a.task_id), dtstart));
        s.push_str(&format!("DTSTAMP:{}\r\n", plan.now.format("%Y%m%dT%H%M%SZ")));
        s.push_str(&format!("DTSTART:{}\r\n", dtstart));
        s.push_str(&format!("DTEND:{}\r\n", dtend));
        s.push_str(&format!("SUMMARY:{}\r\n", escape_ics(&meta.title)));
        s.push_str(&format!("DESCRIPTION:{}\r\n", escape_ics(&meta.description)));
        if let Some(category) = task.category {
            s.push_str(&format!("CATEGORIES:{}\r\n", escape_ics(category.display_name())));
        }
        s.push_str("END:VEVENT\r\n");
    }

    s.push_str("END:VCALENDAR\r\n");
    s
}

fn escape_ics(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{
        Allocation, EnergyProfile, EnergyThresholds, Interval, OccupiedSet, ScoredTask, Task, TemplateVariant,
    };
    use chrono::TimeZone;

    #[test]
    fn test_ceil_to_quarter_hour() {
        let at = |h, m, s| Utc.with_ymd_and_hms(2026, 3, 2, h, m, s).unwrap();
        assert_eq!(ceil_to_quarter_hour(at(9, 0, 0)), at(9, 0, 0));
        assert_eq!(ceil_to_quarter_hour(at(9, 0, 1)), at(9, 15, 0));
        assert_eq!(ceil_to_quarter_hour(at(9, 44, 59)), at(9, 45, 0));
        assert_eq!(ceil_to_quarter_hour(at(23, 50, 0)), Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_escape_ics() {
        assert_eq!(escape_ics("a,b;c\nd\\"), "a\\,b\\;c\\nd\\\\");
    }

    #[test]
    fn test_allocations_to_ics() {
        let config = SchedulerConfig::default();
        let tz = config.validate().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let (profile, _) = EnergyProfile::from_template(&[], now.date_naive(), 1, tz, &EnergyThresholds::default());
        let task = Task::new("8812", "Figures, draft; v2");
        let interval = Interval::new(
            Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 3, 10, 0, 0).unwrap(),
        );
        let plan = Plan {
            now,
            variant: TemplateVariant::Standard,
            profile,
            ranked: vec![ScoredTask { task, score: 0.5 }],
            allocations: vec![Allocation::new("8812", interval.start.date_naive(), interval)],
            unscheduled: vec![],
            occupied: OccupiedSet::default(),
            issues: vec![],
        };

        let ics = allocations_to_ics(&plan, &config);
        assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(ics.contains("UID:cadence-8812-20260303T090000Z@cadence\r\n"));
        assert!(ics.contains("DTEND:20260303T100000Z\r\n"));
        assert!(ics.contains("SUMMARY:Figures\\, draft\\; v2\r\n"));
        assert!(ics.contains("Task ID: 8812"));
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
    }
}

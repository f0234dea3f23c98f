//! Weekly availability template parser (CSV).
//!
//! Expected header, columns in any order:
//!   Day,Time,Category,Energy,Scope
//!   Monday,09:00 - 10:30,writing,8,work
//!
//! The older four-column sheet (`Day,Time,Scope,Energy`, no category) is also
//! accepted. Cell contents are passed through untouched; the core validates
//! and reports bad rows when it expands the template.

use anyhow::{bail, Context, Result};
use cadence_core::TemplateRow;
use std::io::Read;
use std::path::Path;

fn column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_lowercase();
        names.iter().any(|n| h == *n)
    })
}

/// Parse template rows from any CSV reader.
pub fn parse_template_csv(reader: impl Read) -> Result<Vec<TemplateRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("reading template header")?.clone();
    let Some(day) = column(&headers, &["day", "weekday"]) else {
        bail!("template header has no Day column");
    };
    let Some(time) = column(&headers, &["time", "time range", "hours"]) else {
        bail!("template header has no Time column");
    };
    let category = column(&headers, &["category", "classification"]);
    let energy = column(&headers, &["energy", "energy level"]);
    let scope = column(&headers, &["scope", "task type", "type"]);

    let cell = |record: &csv::StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| record.get(i)).unwrap_or("").to_string()
    };

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.context("reading template row")?;
        if record.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(TemplateRow::new(
            cell(&record, Some(day)),
            cell(&record, Some(time)),
            cell(&record, category),
            cell(&record, energy),
            cell(&record, scope),
        ));
    }
    Ok(rows)
}

pub fn parse_template_file(path: impl AsRef<Path>) -> Result<Vec<TemplateRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_template_csv(file).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_column_template() {
        let csv = "Day,Time,Category,Energy,Scope\n\
                   Monday,09:00 - 10:30,writing,8,work\n\
                   Monday,13:00 - 14:00,,4,work\n\
                   \n\
                   Saturday,10:00 - 12:00,,6,personal\n";
        let rows = parse_template_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], TemplateRow::new("Monday", "09:00 - 10:30", "writing", "8", "work"));
        assert_eq!(rows[1].category, "");
        assert_eq!(rows[2].scope, "personal");
    }

    #[test]
    fn test_legacy_four_column_template() {
        let csv = "Day,Time,Scope,Energy\nTuesday,09:00 - 11:00,work,7\n";
        let rows = parse_template_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows, vec![TemplateRow::new("Tuesday", "09:00 - 11:00", "", "7", "work")]);
    }

    #[test]
    fn test_short_rows_pass_through_for_reporting() {
        let csv = "Day,Time,Category,Energy,Scope\nWednesday,09:00 - 10:00\n";
        let rows = parse_template_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].raw_energy, "");
        assert_eq!(rows[0].scope, "");
    }

    #[test]
    fn test_missing_required_header() {
        let err = parse_template_csv("When,Energy\nMonday,5\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Day"));
    }
}

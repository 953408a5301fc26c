//! Reading tabular (CSV) task data into [`ImportRow`]s.
//!
//! The first record is the header. Columns are matched by name
//! (case-insensitive, surrounding whitespace ignored): `Task`, `Start`,
//! `Finish`, `Category`, `Status` and optionally `Notes`; other columns
//! are ignored. A column absent from the header leaves the field `None`
//! on every row, which `TaskStore::import_from_table` reports as an
//! import error.
//!
//! Fields may be double-quoted; inside quotes, commas and line breaks are
//! literal and `""` is an escaped quote.

use crate::models::ImportRow;
use crate::{Error, Result};

/// Parse CSV text into import rows. Blank lines are skipped.
pub fn parse_csv(text: &str) -> Result<Vec<ImportRow>> {
    let mut records = parse_records(text.trim_start_matches('\u{feff}'))?.into_iter();

    let header = records
        .next()
        .ok_or_else(|| Error::Import("CSV has no header row".to_string()))?;
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let task = column("Task");
    let start = column("Start");
    let finish = column("Finish");
    let category = column("Category");
    let status = column("Status");
    let notes = column("Notes");

    let field = |record: &[String], idx: Option<usize>| -> Option<String> {
        idx.map(|i| record.get(i).map(|v| v.trim().to_string()).unwrap_or_default())
    };

    Ok(records
        .map(|record| ImportRow {
            task: field(&record, task),
            start: field(&record, start),
            finish: field(&record, finish),
            category: field(&record, category),
            status: field(&record, status),
            notes: field(&record, notes),
        })
        .collect())
}

/// Split CSV text into records of fields.
fn parse_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::Import("unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }

    Ok(records)
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.iter().all(|f| f.trim().is_empty());
    if !blank {
        records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_csv() {
        let csv = "Task,Start,Finish,Category,Status,Notes\n\
                   Design,2024-01-01,2024-01-10,Planning,未開始,first\n\
                   Build,2024-01-11,2024-01-20,Dev,進行中,\n";
        let rows = parse_csv(csv).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].task.as_deref(), Some("Design"));
        assert_eq!(rows[0].notes.as_deref(), Some("first"));
        assert_eq!(rows[1].status.as_deref(), Some("進行中"));
        assert_eq!(rows[1].notes.as_deref(), Some(""));
    }

    #[test]
    fn test_missing_optional_notes_column() {
        let csv = "Task,Start,Finish,Category,Status\nA,2024-01-01,2024-01-02,X,已完成";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].notes, None);
    }

    #[test]
    fn test_missing_required_column_leaves_none() {
        let csv = "Task,Finish,Category,Status\nA,2024-01-02,X,已完成\n";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows[0].start, None);
        assert_eq!(rows[0].finish.as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn test_header_order_and_case_do_not_matter() {
        let csv = "status, task ,finish,start,CATEGORY,Extra\r\n未開始,A,2024-01-02,2024-01-01,X,ignored\r\n";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows[0].task.as_deref(), Some("A"));
        assert_eq!(rows[0].start.as_deref(), Some("2024-01-01"));
        assert_eq!(rows[0].category.as_deref(), Some("X"));
    }

    #[test]
    fn test_quoted_fields() {
        let csv = "Task,Start,Finish,Category,Status,Notes\n\
                   \"Design, phase 1\",2024-01-01,2024-01-10,Planning,未開始,\"say \"\"hi\"\"\nthen go\"\n";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task.as_deref(), Some("Design, phase 1"));
        assert_eq!(rows[0].notes.as_deref(), Some("say \"hi\"\nthen go"));
    }

    #[test]
    fn test_blank_lines_skipped_and_bom_stripped() {
        let csv = "\u{feff}Task,Start,Finish,Category,Status\n\nA,2024-01-01,2024-01-02,X,已完成\n\n";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task.as_deref(), Some("A"));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(parse_csv(""), Err(Error::Import(_))));
    }

    #[test]
    fn test_unterminated_quote_is_error() {
        let csv = "Task,Start\n\"open,2024-01-01\n";
        assert!(matches!(parse_csv(csv), Err(Error::Import(_))));
    }

    #[test]
    fn test_short_record_yields_empty_fields() {
        let csv = "Task,Start,Finish,Category,Status\nA,2024-01-01\n";
        let rows = parse_csv(csv).unwrap();
        assert_eq!(rows[0].finish.as_deref(), Some(""));
    }
}

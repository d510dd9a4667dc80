//! Vendor export parsing.
//!
//! Exports carry an arbitrary preamble before the real header row, and the
//! header names drift between export generations. The header is the first line
//! naming both a tag column and an end-date column; everything above it is
//! ignored.
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs;
use std::path::Path;

/// Tag column aliases, in order of preference.
pub const TAG_COLUMNS: [&str; 2] = ["Svc Tag", "Tag"];
/// End-of-service column aliases, in order of preference.
pub const DATE_COLUMNS: [&str; 2] = ["Hardware/Primary End Date", "Existing End Date"];

/// One usable data row. The tag is not case-normalized yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub tag: String,
    pub end_of_service: String,
}

/// Result of importing a single export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Rows(Vec<ExportRow>),
    MissingHeader,
}

/// Read and parse one export file from disk.
pub fn read_export(path: &Path) -> Result<ImportOutcome> {
    let bytes = fs::read(path).with_context(|| format!("read export {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    parse_export(&text).with_context(|| format!("parse export {}", path.display()))
}

/// Parse export text, locating the header row first.
pub fn parse_export(text: &str) -> Result<ImportOutcome> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let Some(offset) = header_offset(text) else {
        return Ok(ImportOutcome::MissingHeader);
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text[offset..].as_bytes());
    let headers = reader.headers().context("read export header")?.clone();
    let (Some(tag_idx), Some(date_idx)) = (
        column_index(&headers, &TAG_COLUMNS),
        column_index(&headers, &DATE_COLUMNS),
    ) else {
        return Ok(ImportOutcome::MissingHeader);
    };

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("read export row {}", row_idx + 1))?;
        let tag = record.get(tag_idx).unwrap_or("").trim();
        let end_of_service = record.get(date_idx).unwrap_or("").trim();
        if tag.is_empty() || end_of_service.is_empty() {
            continue;
        }
        rows.push(ExportRow {
            tag: tag.to_string(),
            end_of_service: end_of_service.to_string(),
        });
    }
    Ok(ImportOutcome::Rows(rows))
}

/// Byte offset of the header line, if any line qualifies.
fn header_offset(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if is_header_line(line) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn is_header_line(line: &str) -> bool {
    let columns: Vec<&str> = line
        .split(',')
        .map(|col| col.trim().trim_matches('"').trim())
        .collect();
    let has_any = |aliases: &[&str]| aliases.iter().any(|alias| columns.contains(alias));
    has_any(&TAG_COLUMNS) && has_any(&DATE_COLUMNS)
}

/// Pick the first alias the header carries; exactly one alias is used per file.
fn column_index(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|header| header == *alias))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(outcome: ImportOutcome) -> Vec<(String, String)> {
        match outcome {
            ImportOutcome::Rows(rows) => rows
                .into_iter()
                .map(|row| (row.tag, row.end_of_service))
                .collect(),
            ImportOutcome::MissingHeader => panic!("expected rows"),
        }
    }

    #[test]
    fn header_found_after_metadata_preamble() {
        let text = "Report generated,2023-03-29\nCustomer,RACS\n\
                    Svc Tag, Model ,Hardware/Primary End Date\n\
                    abc123,R640,2026-05-01\n";
        let parsed = rows(parse_export(text).expect("parse"));
        assert_eq!(parsed, vec![("abc123".to_string(), "2026-05-01".to_string())]);
    }

    #[test]
    fn alternate_aliases_are_accepted() {
        let text = "Tag,Existing End Date\nX1 , 2024-01-01\n";
        let parsed = rows(parse_export(text).expect("parse"));
        assert_eq!(parsed, vec![("X1".to_string(), "2024-01-01".to_string())]);
    }

    #[test]
    fn preferred_alias_wins_when_both_present() {
        let text = "Tag,Svc Tag,Existing End Date,Hardware/Primary End Date\n\
                    old,NEW,2020-01-01,2030-01-01\n";
        let parsed = rows(parse_export(text).expect("parse"));
        assert_eq!(parsed, vec![("NEW".to_string(), "2030-01-01".to_string())]);
    }

    #[test]
    fn rows_missing_tag_or_date_are_dropped() {
        let text = "Svc Tag,Hardware/Primary End Date\n,2024-01-01\nA1,\n  ,  \nB2,2024-02-02\n";
        let parsed = rows(parse_export(text).expect("parse"));
        assert_eq!(parsed, vec![("B2".to_string(), "2024-02-02".to_string())]);
    }

    #[test]
    fn missing_header_yields_no_rows() {
        let text = "Svc Tag,Ship Date\nA1,2024-01-01\n";
        assert_eq!(
            parse_export(text).expect("parse"),
            ImportOutcome::MissingHeader
        );
    }

    #[test]
    fn short_rows_do_not_abort_the_file() {
        let text = "Svc Tag,Model,Hardware/Primary End Date\nA1\nB2,R650,2025-05-05\n";
        let parsed = rows(parse_export(text).expect("parse"));
        assert_eq!(parsed, vec![("B2".to_string(), "2025-05-05".to_string())]);
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let text = "\u{feff}Svc Tag,Hardware/Primary End Date\nA1,2024-01-01\n";
        assert_eq!(rows(parse_export(text).expect("parse")).len(), 1);
    }
}

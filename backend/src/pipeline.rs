//! High-level roster loading.
//!
//! Combines reading and normalization:
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  xlsx / csv │────▶│   Parser    │────▶│  Normalize  │────▶│ RosterStore │
//! │   upload    │     │ (auto-fmt)  │     │ (defaults)  │     │  (session)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! A [`ParseError`](crate::error::ParseError) stops the load before any
//! roster exists.
//!
//! # Example
//!
//! ```rust,ignore
//! use swimroll::pipeline::load_roster_file;
//!
//! let loaded = load_roster_file("roster.xlsx")?;
//! println!("{} students in {} classes", loaded.roster.len(), loaded.roster.list_classes().len());
//! ```

use serde::Serialize;
use std::path::Path;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{ParseError, PipelineResult};
use crate::normalize::{normalize_table, NormalizeReport};
use crate::parser::{parse_bytes_auto, parse_file_auto, ParsedDocument, SourceFormat};
use crate::roster::RosterStore;
use crate::view::{apply_edits, AddressedEdit};

/// Where a roster came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub format: SourceFormat,
    pub sheet: Option<String>,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadedRoster {
    pub roster: RosterStore,
    pub source: SourceInfo,
    pub report: NormalizeReport,
}

/// Load and normalize a roster file.
pub fn load_roster_file<P: AsRef<Path>>(path: P) -> PipelineResult<LoadedRoster> {
    log_info(format!("📖 Reading {}...", path.as_ref().display()));
    let doc = parse_file_auto(path)?;
    Ok(load_parsed(doc))
}

/// Load and normalize uploaded bytes.
pub fn load_roster_bytes(bytes: &[u8], name: Option<&str>) -> PipelineResult<LoadedRoster> {
    log_info(format!(
        "📖 Reading {} ({} bytes)...",
        name.unwrap_or("upload"),
        bytes.len()
    ));
    let doc = parse_bytes_auto(bytes)?;
    Ok(load_parsed(doc))
}

/// Read a JSON edits file and apply it to a roster.
pub fn apply_edits_file<P: AsRef<Path>>(roster: &mut RosterStore, path: P) -> PipelineResult<usize> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(ParseError::from)?;
    let edits: Vec<AddressedEdit> = serde_json::from_str(&content)?;
    let applied = apply_edits(roster, &edits)?;
    log_success(format!("Applied {} edits", applied));
    Ok(applied)
}

fn load_parsed(doc: ParsedDocument) -> LoadedRoster {
    log_source(&doc);

    let source = SourceInfo {
        format: doc.format,
        sheet: doc.sheet.clone(),
        encoding: doc.encoding.clone(),
        delimiter: doc.delimiter,
        headers: doc.table.headers.clone(),
        row_count: doc.table.rows.len(),
    };

    log_info("🧹 Normalizing values...");
    let (records, report) = normalize_table(&doc.table);
    log_report(&report);

    let roster = RosterStore::new(records);
    log_success(format!(
        "{} students in {} classes",
        roster.len(),
        roster.list_classes().len()
    ));

    LoadedRoster {
        roster,
        source,
        report,
    }
}

fn log_source(doc: &ParsedDocument) {
    match doc.format {
        SourceFormat::Csv => {
            log_success(format!(
                "Detected text table (encoding: {}, separator: '{}')",
                doc.encoding.as_deref().unwrap_or("?"),
                format_delimiter(doc.delimiter.unwrap_or(','))
            ));
        }
        _ => {
            log_success(format!(
                "Detected workbook, sheet '{}'",
                doc.sheet.as_deref().unwrap_or("?")
            ));
        }
    }
    log_success(format!("Read {} rows", doc.table.rows.len()));
    log_info(format!("📋 {} columns:", doc.table.headers.len()));
    for (i, col) in doc.table.headers.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }
}

fn log_report(report: &NormalizeReport) {
    if report.defaulted_participation > 0 {
        log_info_indent(format!("{} blank participation values set to 參加", report.defaulted_participation), 1);
    }
    if report.legacy_values > 0 {
        log_info_indent(format!("{} legacy yes/no values mapped", report.legacy_values), 1);
    }
    for line in report.warnings() {
        log_warning(line);
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::export::{export_class, write_template};
    use crate::models::{Level, Participation};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_csv_bytes() {
        let csv = "班級,座號,姓名,是否參加,級數\n1A,5,Alice,,3\n1A,2,Bob,否,2\n";
        let loaded = load_roster_bytes(csv.as_bytes(), Some("roster.csv")).unwrap();

        assert_eq!(loaded.source.format, SourceFormat::Csv);
        assert_eq!(loaded.source.row_count, 2);
        assert!(loaded.report.legacy_column);
        assert_eq!(loaded.roster.list_classes(), vec!["1A"]);

        let bob = &loaded.roster.records()[1];
        assert_eq!(bob.participation, Participation::NotJoining);
        assert_eq!(bob.effective_level(), None);
    }

    #[test]
    fn test_parse_error_halts() {
        let err = load_roster_bytes(b"", None).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(ParseError::EmptyFile)));
    }

    #[test]
    fn test_load_file_and_edits() {
        let mut roster_file = NamedTempFile::new().unwrap();
        roster_file
            .write_all(&write_template(10).unwrap())
            .unwrap();

        let mut loaded = load_roster_file(roster_file.path()).unwrap();
        assert_eq!(loaded.source.format, SourceFormat::Workbook);
        assert_eq!(loaded.roster.len(), 1);

        let mut edits_file = NamedTempFile::new().unwrap();
        write!(edits_file, r#"[{{"row": 0, "participation": "參加", "level": 2}}]"#).unwrap();
        let applied = apply_edits_file(&mut loaded.roster, edits_file.path()).unwrap();

        assert_eq!(applied, 1);
        assert_eq!(loaded.roster.records()[0].level, Level::new(2));
        assert!(export_class(&loaded.roster, "四年一班").is_ok());
    }

    #[test]
    fn test_bad_edits_file() {
        let mut loaded = load_roster_bytes("班級,姓名\n1A,Amy\n".as_bytes(), None).unwrap();

        let mut edits_file = NamedTempFile::new().unwrap();
        write!(edits_file, r#"[{{"row": 0, "participation": "joining", "level": 9}}]"#).unwrap();
        let err = apply_edits_file(&mut loaded.roster, edits_file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Edits(_)));
    }
}

//! Export transform.
//!
//! This module turns class rosters into spreadsheets:
//! - Sheet: fixed ten-column table with one-hot levels and a totals row
//! - Xlsx: serialization of one class
//! - Bundle: every class in one zip archive
//! - Template: blank roster with dropdown validation

pub mod bundle;
pub mod sheet;
pub mod template;
pub mod xlsx;

pub use bundle::{bundle_classes, entry_name, export_bundle, BundleSummary};
pub use sheet::{build_sheet, sort_rows, ExportRow, ExportSheet, TotalsRow};
pub use template::write_template;
pub use xlsx::{sheet_name, write_sheet_xlsx};

use crate::api::logs::log_success;
use crate::error::{ExportError, ExportResult};
use crate::roster::RosterStore;

/// Export one class as xlsx bytes.
///
/// A class with no records has nothing to export and is an error here; the
/// bundle path skips such classes instead.
pub fn export_class(store: &RosterStore, class_id: &str) -> ExportResult<Vec<u8>> {
    let roster = store.class_roster(class_id);
    if roster.is_empty() {
        return Err(ExportError::EmptyClass(class_id.to_string()));
    }

    let sheet = build_sheet(&roster);
    let bytes = write_sheet_xlsx(&sheet)?;
    log_success(format!(
        "Exported {} ({} students, {} joining)",
        class_id,
        sheet.rows.len(),
        sheet.totals.participation
    ));
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{columns, Level, Participation, StudentRecord};
    use crate::parser::parse_workbook;

    fn store() -> RosterStore {
        RosterStore::new(vec![
            StudentRecord::new("1A", "5", "Alice").with_level(Level::new(3)),
            StudentRecord::new("1A", "2", "Bob")
                .with_participation(Participation::NotJoining)
                .with_level(Level::new(2)),
            StudentRecord::new("1A", "x", "Xavier"),
            StudentRecord::new("2B", "1", "Other"),
        ])
    }

    #[test]
    fn test_export_class_layout() {
        let bytes = export_class(&store(), "1A").unwrap();
        let (sheet, table) = parse_workbook(&bytes).unwrap();

        assert_eq!(sheet, "1A");
        assert_eq!(table.headers, columns::EXPORT_HEADERS);
        assert_eq!(table.rows.len(), 4);

        assert_eq!(table.rows[0], vec!["1A", "2", "Bob", "0", "0", "0", "0", "0", "0", "0"]);
        assert_eq!(table.rows[1], vec!["1A", "5", "Alice", "1", "0", "0", "0", "1", "0", "0"]);
        assert_eq!(table.rows[2], vec!["1A", "x", "Xavier", "1", "0", "0", "0", "0", "0", "0"]);
        assert_eq!(table.rows[3], vec!["合計", "", "", "2", "0", "0", "0", "1", "0", "0"]);
    }

    #[test]
    fn test_export_keeps_seat_text() {
        let s = RosterStore::new(vec![
            StudentRecord::new("3C", "007", "Zed"),
            StudentRecord::new("3C", "1e2", "Yan"),
            StudentRecord::new("3C", "12", "Xu"),
        ]);
        let (_, table) = parse_workbook(&export_class(&s, "3C").unwrap()).unwrap();
        let seats: Vec<&str> = table.rows.iter().map(|r| r[1].as_str()).collect();

        assert_eq!(seats, vec!["007", "12", "1e2", ""]);
    }

    #[test]
    fn test_export_only_includes_requested_class() {
        let bytes = export_class(&store(), "2B").unwrap();
        let (_, table) = parse_workbook(&bytes).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], "Other");
    }

    #[test]
    fn test_export_empty_class_is_error() {
        let err = export_class(&store(), "9Z").unwrap_err();
        assert!(matches!(err, ExportError::EmptyClass(ref c) if c == "9Z"));
    }

    #[test]
    fn test_re_export_is_content_identical() {
        let s = store();
        let first = parse_workbook(&export_class(&s, "1A").unwrap()).unwrap();
        let second = parse_workbook(&export_class(&s, "1A").unwrap()).unwrap();

        assert_eq!(first.0, second.0);
        assert_eq!(first.1.headers, second.1.headers);
        assert_eq!(first.1.rows, second.1.rows);
    }
}

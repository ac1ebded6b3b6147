//! Value normalizer: raw roster rows → canonical [`StudentRecord`]s.
//!
//! This is the only place defaults are filled in. Downstream components
//! assume the canonical schema holds.
//!
//! Rules, applied in order:
//!
//! 1. missing cells are empty strings (guaranteed by [`RawTable`])
//! 2. the legacy `是否參加` column stands in for `參加意願` when the latter is absent
//! 3. missing `班級` / `座號` / `姓名` / `參加意願` / `級數` columns read as empty
//! 4. legacy yes/no tokens map onto [`Participation`]
//! 5. blank participation becomes joining
//! 6. anything other than `0`..`5` in the level column becomes unset

use serde::Serialize;

use crate::models::{columns, Level, Participation, StudentRecord};
use crate::parser::RawTable;

/// Counters for values that were silently replaced.
///
/// Never an error; only logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeReport {
    /// Rows normalized.
    pub rows: usize,
    /// `是否參加` was used in place of `參加意願`.
    pub legacy_column: bool,
    /// Canonical columns absent from the input.
    pub missing_columns: Vec<String>,
    /// Blank participation defaulted to joining.
    pub defaulted_participation: usize,
    /// Legacy yes/no tokens mapped.
    pub legacy_values: usize,
    /// Unrecognized participation tokens treated as joining.
    pub unrecognized_participation: usize,
    /// Non-blank level values outside 0-5 discarded.
    pub discarded_levels: usize,
}

impl NormalizeReport {
    /// True when every value was already canonical.
    pub fn is_clean(&self) -> bool {
        !self.legacy_column
            && self.missing_columns.is_empty()
            && self.unrecognized_participation == 0
            && self.discarded_levels == 0
    }

    /// Human-readable lines for every non-canonical finding.
    pub fn warnings(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.legacy_column {
            lines.push(format!(
                "Using legacy column {} as {}",
                columns::LEGACY_PARTICIPATION,
                columns::PARTICIPATION
            ));
        }
        if !self.missing_columns.is_empty() {
            lines.push(format!(
                "Missing columns filled with blanks: {}",
                self.missing_columns.join(", ")
            ));
        }
        if self.unrecognized_participation > 0 {
            lines.push(format!(
                "{} unrecognized participation values treated as 參加",
                self.unrecognized_participation
            ));
        }
        if self.discarded_levels > 0 {
            lines.push(format!("{} level values outside 0-5 cleared", self.discarded_levels));
        }
        lines
    }
}

/// Resolved column positions for one table.
struct ColumnMap {
    class: Option<usize>,
    seat: Option<usize>,
    name: Option<usize>,
    participation: Option<usize>,
    level: Option<usize>,
}

impl ColumnMap {
    fn resolve(table: &RawTable, report: &mut NormalizeReport) -> Self {
        let participation = match table.column_index(columns::PARTICIPATION) {
            Some(idx) => Some(idx),
            None => {
                let legacy = table.column_index(columns::LEGACY_PARTICIPATION);
                report.legacy_column = legacy.is_some();
                legacy
            }
        };

        let map = Self {
            class: table.column_index(columns::CLASS),
            seat: table.column_index(columns::SEAT),
            name: table.column_index(columns::NAME),
            participation,
            level: table.column_index(columns::LEVEL),
        };

        let checks = [
            (columns::CLASS, map.class),
            (columns::SEAT, map.seat),
            (columns::NAME, map.name),
            (columns::PARTICIPATION, map.participation),
            (columns::LEVEL, map.level),
        ];
        report.missing_columns = checks
            .iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(name, _)| name.to_string())
            .collect();

        map
    }
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

/// Normalize every row of `table`, one record per row, order preserved.
pub fn normalize_table(table: &RawTable) -> (Vec<StudentRecord>, NormalizeReport) {
    let mut report = NormalizeReport::default();
    let cols = ColumnMap::resolve(table, &mut report);

    let records = table
        .rows
        .iter()
        .map(|row| {
            let participation =
                normalize_participation(cell(row, cols.participation), &mut report);
            let level = normalize_level(cell(row, cols.level), &mut report);

            StudentRecord {
                class_id: cell(row, cols.class).trim().to_string(),
                seat_number: cell(row, cols.seat).trim().to_string(),
                name: cell(row, cols.name).trim().to_string(),
                participation,
                level,
            }
        })
        .collect();

    report.rows = table.rows.len();
    (records, report)
}

/// Map a participation cell to the enum (rules 4 and 5).
///
/// Blank and unrecognized values both default to joining.
pub fn normalize_participation(raw: &str, report: &mut NormalizeReport) -> Participation {
    let token = raw.trim();
    if token.is_empty() {
        report.defaulted_participation += 1;
        return Participation::Joining;
    }

    match Participation::from_token(token) {
        Some(p) => {
            if token != Participation::Joining.label() && token != Participation::NotJoining.label() {
                report.legacy_values += 1;
            }
            p
        }
        None => {
            report.unrecognized_participation += 1;
            Participation::Joining
        }
    }
}

/// Map a level cell to a level or unset (rule 6).
pub fn normalize_level(raw: &str, report: &mut NormalizeReport) -> Option<Level> {
    let level = Level::from_token(raw);
    if level.is_none() && !raw.trim().is_empty() {
        report.discarded_levels += 1;
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_blank_participation_defaults_to_joining() {
        let t = table(
            &["班級", "座號", "姓名", "參加意願", "級數"],
            &[&["1A", "1", "Amy", "", ""], &["1A", "2", "Ben", "   ", "1"]],
        );
        let (records, report) = normalize_table(&t);

        assert!(records.iter().all(|r| r.participation == Participation::Joining));
        assert_eq!(report.defaulted_participation, 2);
    }

    #[test]
    fn test_missing_participation_column_defaults_to_joining() {
        let t = table(&["班級", "座號", "姓名"], &[&["1A", "1", "Amy"]]);
        let (records, report) = normalize_table(&t);

        assert_eq!(records[0].participation, Participation::Joining);
        assert_eq!(records[0].level, None);
        assert_eq!(report.missing_columns, vec!["參加意願", "級數"]);
        assert_eq!(report.warnings(), vec!["Missing columns filled with blanks: 參加意願, 級數"]);
    }

    #[test]
    fn test_legacy_column_and_values() {
        let t = table(
            &["班級", "座號", "姓名", "是否參加"],
            &[&["1A", "1", "Amy", "是"], &["1A", "2", "Ben", "否"]],
        );
        let (records, report) = normalize_table(&t);

        assert!(report.legacy_column);
        assert_eq!(report.legacy_values, 2);
        assert_eq!(records[0].participation, Participation::Joining);
        assert_eq!(records[1].participation, Participation::NotJoining);
    }

    #[test]
    fn test_canonical_column_wins_over_legacy() {
        let t = table(
            &["班級", "姓名", "是否參加", "參加意願"],
            &[&["1A", "Amy", "否", "參加"]],
        );
        let (records, report) = normalize_table(&t);

        assert!(!report.legacy_column);
        assert_eq!(records[0].participation, Participation::Joining);
    }

    #[test]
    fn test_unrecognized_token_defaults_to_joining() {
        let t = table(&["班級", "姓名", "參加意願"], &[&["1A", "Amy", "maybe"]]);
        let (records, report) = normalize_table(&t);

        assert_eq!(records[0].participation, Participation::Joining);
        assert_eq!(report.unrecognized_participation, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_out_of_range_levels_unset() {
        let t = table(
            &["班級", "姓名", "級數"],
            &[
                &["1A", "a", "0"],
                &["1A", "b", "5"],
                &["1A", "c", "6"],
                &["1A", "d", "-1"],
                &["1A", "e", "2.5"],
                &["1A", "f", ""],
                &["1A", "g", "初級"],
                &["1A", "h", " 3"],
            ],
        );
        let (records, report) = normalize_table(&t);
        let levels: Vec<_> = records.iter().map(|r| r.level.map(|l| l.value())).collect();

        assert_eq!(levels, vec![Some(0), Some(5), None, None, None, None, None, None]);
        assert_eq!(report.discarded_levels, 5);
    }

    #[test]
    fn test_order_preserved_and_extra_columns_ignored() {
        let t = table(
            &["備註", "姓名", "班級", "座號"],
            &[&["x", "Cat", "2B", "9"], &["y", "Dan", "1A", "3"]],
        );
        let (records, _) = normalize_table(&t);

        assert_eq!(records[0].name, "Cat");
        assert_eq!(records[0].class_id, "2B");
        assert_eq!(records[1].seat_number, "3");
    }

    #[test]
    fn test_round_trip_example_rows() {
        let t = table(
            &["班級", "座號", "姓名", "參加意願", "級數"],
            &[&["1A", "5", "Alice", "", "3"], &["1A", "2", "Bob", "不參加", "2"]],
        );
        let (records, _) = normalize_table(&t);

        assert_eq!(records[0].participation, Participation::Joining);
        assert_eq!(records[0].effective_level(), Level::new(3));
        assert_eq!(records[1].participation, Participation::NotJoining);
        assert_eq!(records[1].effective_level(), None);
    }
}

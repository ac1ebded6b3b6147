//! Class roster → fixed-schema export table with a totals row.
//!
//! ```text
//! 班級 | 座號 | 姓名 | 參加意願 | 0級 | 1級 | 2級 | 3級 | 4級 | 5級
//! 1A   | 2    | Bob  | 0        | 0   | 0   | 0   | 0   | 0   | 0
//! 1A   | 5    | Alice| 1        | 0   | 0   | 0   | 1   | 0   | 0
//! 合計 |      |      | 1        | 0   | 0   | 0   | 1   | 0   | 0
//! ```

use serde::Serialize;
use std::cmp::Ordering;

use crate::models::{seat_value, StudentRecord};
use crate::roster::ClassRoster;

/// One student line of an export.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub class_id: String,
    pub seat_number: String,
    pub name: String,
    /// 1 when joining, 0 otherwise.
    pub participation: u32,
    /// One-hot level indicators; all zero when not joining or unleveled.
    pub levels: [u32; 6],
}

impl ExportRow {
    pub fn from_record(record: &StudentRecord) -> Self {
        let participation = record.participation.flag();
        let mut levels = [0; 6];
        if participation == 1 {
            if let Some(level) = record.level {
                levels[level.index()] = 1;
            }
        }

        Self {
            class_id: record.class_id.clone(),
            seat_number: record.seat_number.clone(),
            name: record.name.clone(),
            participation,
            levels,
        }
    }

    fn seat_key(&self) -> Option<f64> {
        seat_value(&self.seat_number)
    }
}

/// The synthetic last row: column sums.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsRow {
    pub participation: u32,
    pub levels: [u32; 6],
}

impl TotalsRow {
    fn sum(rows: &[ExportRow]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, row| {
            acc.participation += row.participation;
            for (total, value) in acc.levels.iter_mut().zip(row.levels) {
                *total += value;
            }
            acc
        })
    }
}

/// A class ready for serialization: sorted data rows plus totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSheet {
    pub class_id: String,
    pub rows: Vec<ExportRow>,
    pub totals: TotalsRow,
}

/// Build the export table for one class.
pub fn build_sheet(roster: &ClassRoster<'_>) -> ExportSheet {
    let mut rows: Vec<ExportRow> = roster
        .records
        .iter()
        .map(|r| ExportRow::from_record(r))
        .collect();
    sort_rows(&mut rows);
    let totals = TotalsRow::sum(&rows);

    ExportSheet {
        class_id: roster.class_id.to_string(),
        rows,
        totals,
    }
}

/// Stable sort by class, then numeric seat; non-numeric seats go last.
pub fn sort_rows(rows: &mut [ExportRow]) {
    rows.sort_by(|a, b| {
        a.class_id
            .cmp(&b.class_id)
            .then_with(|| compare_seats(a.seat_key(), b.seat_key()))
    });
}

fn compare_seats(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

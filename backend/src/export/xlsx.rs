//! Export table → xlsx bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use super::sheet::{ExportRow, ExportSheet, TotalsRow};
use crate::error::ExportResult;
use crate::models::{columns, seat_as_cell_number};

/// Excel caps sheet names at 31 characters.
const MAX_SHEET_NAME_CHARS: usize = 31;

static INVALID_SHEET_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\[\]:*?/\\]").expect("static regex"));

/// Column indices of an exported class sheet.
mod cols {
    pub const CLASS: u16 = 0;
    pub const SEAT: u16 = 1;
    pub const NAME: u16 = 2;
    pub const PARTICIPATION: u16 = 3;
    pub const FIRST_LEVEL: u16 = 4;
}

/// A worksheet name Excel accepts, derived from a class id.
pub fn sheet_name(class_id: &str) -> String {
    let cleaned = INVALID_SHEET_CHARS.replace_all(class_id.trim(), "_");
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME_CHARS).collect();
    let name = truncated.trim_matches('\'').trim();

    if name.is_empty() {
        "Sheet1".to_string()
    } else {
        name.to_string()
    }
}

/// Serialize one class: header row, data rows, totals row.
pub fn write_sheet_xlsx(sheet: &ExportSheet) -> ExportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let ws = workbook.add_worksheet();
    ws.set_name(sheet_name(&sheet.class_id))?;

    for (col, header) in columns::EXPORT_HEADERS.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    let mut row: u32 = 1;
    for data in &sheet.rows {
        write_data_row(ws, row, data)?;
        row += 1;
    }
    write_totals_row(ws, row, &sheet.totals, &header_format)?;

    ws.set_column_width(cols::CLASS, 12)?;
    ws.set_column_width(cols::NAME, 14)?;

    Ok(workbook.save_to_buffer()?)
}

fn write_data_row(ws: &mut Worksheet, row: u32, data: &ExportRow) -> ExportResult<()> {
    ws.write_string(row, cols::CLASS, &data.class_id)?;

    match seat_as_cell_number(&data.seat_number) {
        Some(n) => {
            ws.write_number(row, cols::SEAT, n)?;
        }
        None if data.seat_number.trim().is_empty() => {}
        None => {
            ws.write_string(row, cols::SEAT, &data.seat_number)?;
        }
    }

    ws.write_string(row, cols::NAME, &data.name)?;
    ws.write_number(row, cols::PARTICIPATION, data.participation)?;
    for (i, value) in data.levels.iter().enumerate() {
        ws.write_number(row, cols::FIRST_LEVEL + i as u16, *value)?;
    }
    Ok(())
}

fn write_totals_row(
    ws: &mut Worksheet,
    row: u32,
    totals: &TotalsRow,
    format: &Format,
) -> ExportResult<()> {
    ws.write_string_with_format(row, cols::CLASS, columns::TOTAL_MARKER, format)?;
    ws.write_number_with_format(row, cols::PARTICIPATION, totals.participation, format)?;
    for (i, value) in totals.levels.iter().enumerate() {
        ws.write_number_with_format(row, cols::FIRST_LEVEL + i as u16, *value, format)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_name_sanitized() {
        assert_eq!(sheet_name("四年一班"), "四年一班");
        assert_eq!(sheet_name("4/1 [A]"), "4_1 _A_");
        assert_eq!(sheet_name(""), "Sheet1");
        assert_eq!(sheet_name("'quoted'"), "quoted");
        assert_eq!(sheet_name(&"x".repeat(40)).chars().count(), 31);
    }
}

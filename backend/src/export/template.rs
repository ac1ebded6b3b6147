//! Blank roster template with dropdown-constrained entry columns.

use rust_xlsxwriter::{DataValidation, Format, Workbook};

use crate::config::TEMPLATE_SHEET_NAME;
use crate::error::ExportResult;
use crate::models::{columns, Level, Participation};

/// Example row shipped in the template.
const EXAMPLE_ROW: (&str, f64, &str) = ("四年一班", 1.0, "王小明");

/// Build the template: header, one example row, and list validations on the
/// participation and level columns for rows 2 through `rows + 1`.
pub fn write_template(rows: u32) -> ExportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let ws = workbook.add_worksheet();
    ws.set_name(TEMPLATE_SHEET_NAME)?;

    for (col, header) in columns::TEMPLATE_HEADERS.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    let (class_id, seat, name) = EXAMPLE_ROW;
    ws.write_string(1, 0, class_id)?;
    ws.write_number(1, 1, seat)?;
    ws.write_string(1, 2, name)?;
    ws.write_string(1, 3, Participation::Joining.label())?;

    let last_row = rows.max(1);
    let participation_col = 3;
    let level_col = 4;

    let labels: Vec<&str> = Participation::OPTIONS.iter().map(|p| p.label()).collect();
    let participation_list = DataValidation::new().allow_list_strings(&labels)?;
    ws.add_data_validation(1, participation_col, last_row, participation_col, &participation_list)?;

    let levels: Vec<String> = Level::ALL.iter().map(|l| l.to_string()).collect();
    let level_list = DataValidation::new().allow_list_strings(&levels)?;
    ws.add_data_validation(1, level_col, last_row, level_col, &level_list)?;

    ws.set_column_width(0, 12)?;
    ws.set_column_width(2, 14)?;

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_table;
    use crate::parser::parse_workbook;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    #[test]
    fn test_template_round_trips_through_normalizer() {
        let bytes = write_template(500).unwrap();
        let (sheet, table) = parse_workbook(&bytes).unwrap();

        assert_eq!(sheet, TEMPLATE_SHEET_NAME);
        assert_eq!(table.headers, columns::TEMPLATE_HEADERS);

        let (records, report) = normalize_table(&table);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].class_id, "四年一班");
        assert_eq!(records[0].seat_number, "1");
        assert_eq!(records[0].participation, Participation::Joining);
        assert_eq!(records[0].level, None);
        assert!(report.is_clean());
    }

    #[test]
    fn test_template_carries_validations() {
        let bytes = write_template(500).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();

        assert!(xml.contains("dataValidation"));
        assert!(xml.contains("D2:D501"));
        assert!(xml.contains("E2:E501"));
    }
}

//! Spreadsheet reader with format, encoding and delimiter auto-detection.
//!
//! Turns an uploaded document into a [`RawTable`] of text cells. Workbooks
//! (xlsx, xls, ods) are read with calamine; anything else is treated as
//! delimited text. No roster-specific logic here.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use crate::error::{ParseError, ParseResult};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// Container format of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Zip-based workbook (xlsx, ods).
    Workbook,
    /// Legacy OLE workbook (xls).
    LegacyWorkbook,
    /// Delimited text.
    Csv,
}

impl SourceFormat {
    /// Detect the container from leading magic bytes.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(ZIP_MAGIC) {
            Self::Workbook
        } else if bytes.starts_with(OLE_MAGIC) {
            Self::LegacyWorkbook
        } else {
            Self::Csv
        }
    }
}

/// A header row plus data rows of text cells.
///
/// Every row has exactly `headers.len()` cells; missing cells are empty
/// strings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table, trimming headers and padding or truncating rows to the
    /// header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Index of the first column with the given header.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Rows as header → value maps (first duplicate header wins).
    pub fn to_maps(&self) -> Vec<HashMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut map = HashMap::new();
                for (header, value) in self.headers.iter().zip(row) {
                    map.entry(header.clone()).or_insert_with(|| value.clone());
                }
                map
            })
            .collect()
    }
}

/// Result of reading with metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedDocument {
    /// Parsed table.
    pub table: RawTable,
    /// Detected container.
    pub format: SourceFormat,
    /// Worksheet the table came from (workbooks only).
    pub sheet: Option<String>,
    /// Detected text encoding (delimited text only).
    pub encoding: Option<String>,
    /// Detected delimiter (delimited text only).
    pub delimiter: Option<char>,
}

/// Read a document from disk with auto-detection.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> ParseResult<ParsedDocument> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Read document bytes with auto-detection of container, encoding and
/// delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> ParseResult<ParsedDocument> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    match SourceFormat::detect(bytes) {
        format @ (SourceFormat::Workbook | SourceFormat::LegacyWorkbook) => {
            let (sheet, table) = parse_workbook(bytes)?;
            Ok(ParsedDocument {
                table,
                format,
                sheet: Some(sheet),
                encoding: None,
                delimiter: None,
            })
        }
        SourceFormat::Csv => {
            if bytes.contains(&0) {
                return Err(ParseError::UnrecognizedFormat);
            }
            let encoding = detect_encoding(bytes);
            let content = decode_content(bytes, &encoding)?;
            let delimiter = detect_delimiter(&content);
            let table = parse_delimited(&content, delimiter)?;
            Ok(ParsedDocument {
                table,
                format: SourceFormat::Csv,
                sheet: None,
                encoding: Some(encoding),
                delimiter: Some(delimiter),
            })
        }
    }
}

// =============================================================================
// Workbooks
// =============================================================================

/// Read the first worksheet of a workbook; the first row is the header.
pub fn parse_workbook(bytes: &[u8]) -> ParseResult<(String, RawTable)> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ParseError::NoSheets)?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::NoSheets)??;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or(ParseError::NoHeaders)?
        .iter()
        .map(cell_to_string)
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::NoHeaders);
    }

    let data = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    Ok((sheet_name, RawTable::new(headers, data)))
}

/// Render a workbook cell as text.
///
/// Integral floats lose their fraction (`5.0` → `"5"`) so numeric seat numbers
/// and levels compare equal to their typed-in form.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

// =============================================================================
// Delimited text
// =============================================================================

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(b"\xEF\xBB\xBF") || std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "big5" | "big5-hkscs" | "cp950" => "big5".to_string(),
        "gb2312" | "gbk" | "gb18030" => "gbk".to_string(),
        "" => "utf-8".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the given encoding label.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ParseResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| ParseError::Encoding(e.to_string())),
        label => {
            let codec = encoding_rs::Encoding::for_label(label.as_bytes())
                .ok_or_else(|| ParseError::Encoding(format!("unsupported encoding '{}'", label)))?;
            let (decoded, _, had_errors) = codec.decode(bytes);
            if had_errors {
                return Err(ParseError::Encoding(format!("invalid {} byte sequence", codec.name())));
            }
            Ok(decoded.into_owned())
        }
    }
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited text; the first record is the header.
pub fn parse_delimited(content: &str, delimiter: char) -> ParseResult<RawTable> {
    if content.trim().is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|v| v.trim().to_string()).collect());
    }

    Ok(RawTable::new(headers, rows))
}

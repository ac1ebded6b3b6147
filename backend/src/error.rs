//! Error types for the swimroll roster pipeline.
//!
//! This module defines the error hierarchy used across the crate:
//!
//! - [`ParseError`] - the uploaded document cannot be read as a spreadsheet
//! - [`ExportError`] - xlsx / zip serialization failures
//! - [`SessionError`] - unknown session, row or class
//! - [`ConfigError`] - invalid environment configuration
//! - [`PipelineError`] - top-level load orchestration errors
//! - [`ServerError`] - HTTP surface errors
//!
//! Conversion is automatic via `From` implementations so `?` works across
//! layers. Out-of-range participation or level values are never errors; the
//! normalizer silently replaces them with defaults.

use thiserror::Error;

// =============================================================================
// Parse Errors
// =============================================================================

/// The uploaded document could not be read as a spreadsheet.
///
/// Fatal for the upload: no roster is produced.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook container is corrupt or unsupported.
    #[error("Cannot open workbook: {0}")]
    Workbook(String),

    /// Workbook without any worksheet.
    #[error("Workbook has no worksheets")]
    NoSheets,

    /// Empty document.
    #[error("Document is empty")]
    EmptyFile,

    /// No header row found.
    #[error("No header row found")]
    NoHeaders,

    /// Text content could not be decoded.
    #[error("Failed to decode text: {0}")]
    Encoding(String),

    /// Invalid delimited-text content.
    #[error("Invalid delimited text at line {line}: {message}")]
    Csv { line: u64, message: String },

    /// Binary content that is neither a workbook nor text.
    #[error("Unrecognized document format")]
    UnrecognizedFormat,
}

impl From<calamine::Error> for ParseError {
    fn from(err: calamine::Error) -> Self {
        ParseError::Workbook(err.to_string())
    }
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        ParseError::Csv {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while producing class spreadsheets, bundles or the template.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Spreadsheet writer failure.
    #[error("Spreadsheet write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Archive writer failure.
    #[error("Archive write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A class with no records has nothing to export.
    #[error("Class '{0}' has no records")]
    EmptyClass(String),
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors addressing state inside (or the existence of) a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Unknown session id.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Row reference outside the roster.
    #[error("Row {0} does not exist in this roster")]
    RowNotFound(usize),

    /// Class id with no records.
    #[error("Unknown class: {0}")]
    UnknownClass(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value of the wrong shape.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level roster loading errors.
///
/// Returned by [`crate::pipeline::load_roster_file`] and
/// [`crate::pipeline::load_roster_bytes`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Spreadsheet parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Session error (bad edit row, unknown class).
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Edit file could not be decoded.
    #[error("Invalid edits: {0}")]
    Edits(#[from] serde_json::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Upload could not be parsed.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// Export failed.
    #[error("{0}")]
    Export(#[from] ExportError),

    /// Unknown session, row or class.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload larger than the configured limit.
    #[error("Upload exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Parse(e) => ServerError::Parse(e),
            PipelineError::Export(e) => ServerError::Export(e),
            PipelineError::Session(e) => ServerError::Session(e),
            PipelineError::Edits(e) => ServerError::BadRequest(e.to_string()),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

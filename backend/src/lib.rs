//! # Swimroll - swim course rosters from class spreadsheets
//!
//! Swimroll reads a school roster (xlsx, xls or csv), normalizes the
//! participation and level columns, lets school staff filter and edit each class,
//! and exports one sheet per class with a totals row, or all classes in a zip.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  xlsx / csv │────▶│   Parser    │────▶│  Normalize  │────▶│ RosterStore │
//! │   upload    │     │ (auto-fmt)  │     │ (defaults)  │     │  (session)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                     ┌─────────────┐     ┌─────────────┐            │
//!                     │ xlsx / zip  │◀────│   Export    │◀───── View / Stats
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use swimroll::{export_bundle, load_roster_file};
//!
//! let loaded = load_roster_file("roster.xlsx")?;
//! let bundle = export_bundle(&loaded.roster)?;
//! std::fs::write("all.zip", bundle.bytes)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (StudentRecord, Participation, Level)
//! - [`parser`] - Workbook and delimited-text reading with auto-detection
//! - [`normalize`] - Canonical values and defaults
//! - [`roster`] - In-memory roster store
//! - [`view`] - Filter/edit view
//! - [`stats`] - Per-class tallies
//! - [`export`] - Class sheets, zip bundle and template
//! - [`session`] - Upload-scoped state
//! - [`pipeline`] - Load orchestration
//! - [`config`] - Constants and server settings
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod config;

// Reading
pub mod parser;
pub mod normalize;

// Roster
pub mod roster;
pub mod view;
pub mod stats;

// Output
pub mod export;

// Orchestration
pub mod session;
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ExportError,
    ParseError,
    PipelineError,
    ServerError,
    SessionError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    columns,
    Level,
    Participation,
    RowRef,
    StudentRecord,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    parse_bytes_auto,
    parse_file_auto,
    parse_workbook,
    parse_delimited,
    detect_encoding,
    detect_delimiter,
    decode_content,
    ParsedDocument,
    RawTable,
    SourceFormat,
};

// =============================================================================
// Re-exports - Normalization
// =============================================================================

pub use normalize::{normalize_table, NormalizeReport};

// =============================================================================
// Re-exports - Roster, view and stats
// =============================================================================

pub use roster::{ClassRoster, RosterStore};

pub use view::{
    apply_edit,
    apply_edits,
    level_options,
    project,
    AddressedEdit,
    RowEdit,
    ViewRow,
};

pub use stats::{all_class_stats, class_stats, ClassStats};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{
    export_class,
    export_bundle,
    bundle_classes,
    write_template,
    BundleSummary,
    ExportSheet,
};

// =============================================================================
// Re-exports - Pipeline and sessions
// =============================================================================

pub use pipeline::{
    load_roster_file,
    load_roster_bytes,
    apply_edits_file,
    LoadedRoster,
    SourceInfo,
};

pub use session::{Session, SessionRegistry, SessionSummary};

pub use config::ServerConfig;

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{
    UploadResponse,
    ViewResponse,
    EditResponse,
    StatsResponse,
    error_response,
};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}

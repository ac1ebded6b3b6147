//! REST API types for frontend integration.
//!
//! Bodies are camelCase JSON. Participation serializes as `joining` /
//! `not_joining` and accepts the sheet labels 參加 / 不參加 on input.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{Level, Participation};
use crate::session::SessionSummary;
use crate::stats::ClassStats;
use crate::view::{level_options, RowEdit, ViewRow};

/// Response sent after an upload was loaded into a new session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// "ready", or "warning" when normalization replaced values
    pub status: String,

    #[serde(flatten)]
    pub session: SessionSummary,

    /// Normalization warnings, one line each
    pub warnings: Vec<String>,
}

/// Class list of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassesResponse {
    pub session_id: String,
    pub classes: Vec<String>,
}

/// Filtered view of one class with its live tallies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub class_id: String,
    pub rows: Vec<ViewRow>,
    pub stats: ClassStats,
    /// Selector choices for the edit widgets
    pub options: SelectorOptions,
}

/// Dropdown choices of the edit view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorOptions {
    pub participation: Vec<Participation>,
    /// Unset first
    pub level: Vec<Option<Level>>,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            participation: Participation::OPTIONS.to_vec(),
            level: level_options(),
        }
    }
}

/// Result of one row edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResponse {
    pub row: ViewRow,
    /// Tallies of the edited row's class after the edit
    pub stats: ClassStats,
}

/// Body of `PUT /api/sessions/{id}/rows/{row}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EditRequest {
    pub participation: Participation,
    #[serde(default)]
    pub level: Option<Level>,
}

impl From<EditRequest> for RowEdit {
    fn from(req: EditRequest) -> Self {
        RowEdit::new(req.participation, req.level)
    }
}

/// Per-class stats listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub session_id: String,
    pub classes: Vec<ClassStats>,
}

/// `?class=` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassQuery {
    pub class: Option<String>,
}

/// `?class=&name=` query of the view endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    pub class: Option<String>,
    pub name: Option<String>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

//! Domain models for the swimroll roster pipeline.
//!
//! - [`StudentRecord`] - one normalized roster row
//! - [`Participation`] - joining / not joining the course
//! - [`Level`] - swim skill tier 0 through 5
//! - [`RowRef`] - position of a record in the uploaded roster
//!
//! Column header names shared by the reader, the normalizer and the exporter
//! live in [`columns`].

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Column Names
// =============================================================================

/// Header names of the input roster and of the exported class sheets.
pub mod columns {
    /// Class grouping key.
    pub const CLASS: &str = "班級";
    /// Seat number.
    pub const SEAT: &str = "座號";
    /// Student name.
    pub const NAME: &str = "姓名";
    /// Participation (canonical header).
    pub const PARTICIPATION: &str = "參加意願";
    /// Participation (legacy header, "is attending").
    pub const LEGACY_PARTICIPATION: &str = "是否參加";
    /// Swim level.
    pub const LEVEL: &str = "級數";
    /// Marker written in the class column of the totals row.
    pub const TOTAL_MARKER: &str = "合計";

    /// One-hot level indicator headers, `0級` through `5級`.
    pub const LEVEL_INDICATORS: [&str; 6] = ["0級", "1級", "2級", "3級", "4級", "5級"];

    /// Header row of an exported class sheet, in output order.
    pub const EXPORT_HEADERS: [&str; 10] = [
        CLASS, SEAT, NAME, PARTICIPATION, "0級", "1級", "2級", "3級", "4級", "5級",
    ];

    /// Header row of the blank entry template.
    pub const TEMPLATE_HEADERS: [&str; 5] = [CLASS, SEAT, NAME, PARTICIPATION, LEVEL];
}

// =============================================================================
// Participation
// =============================================================================

/// Whether a student takes part in the swim course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participation {
    /// 參加
    #[default]
    #[serde(alias = "參加")]
    Joining,
    /// 不參加
    #[serde(alias = "不參加")]
    NotJoining,
}

impl Participation {
    /// Selector options, in display order.
    pub const OPTIONS: [Participation; 2] = [Participation::Joining, Participation::NotJoining];

    /// Parse a canonical or legacy token.
    ///
    /// Accepts `參加` / `不參加`, the legacy `是` / `否`, and yes/no style
    /// tokens. Returns `None` for blank or unrecognized input.
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized = token.trim().to_lowercase();
        match normalized.as_str() {
            "參加" | "参加" | "是" | "yes" | "y" | "joining" => Some(Self::Joining),
            "不參加" | "不参加" | "否" | "no" | "n" | "not_joining" => Some(Self::NotJoining),
            _ => None,
        }
    }

    /// Canonical label as written in roster sheets.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Joining => "參加",
            Self::NotJoining => "不參加",
        }
    }

    /// Export flag: 1 for joining, 0 otherwise.
    pub fn flag(&self) -> u32 {
        match self {
            Self::Joining => 1,
            Self::NotJoining => 0,
        }
    }

    pub fn is_joining(&self) -> bool {
        matches!(self, Self::Joining)
    }
}

impl fmt::Display for Participation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Level
// =============================================================================

/// Swim skill tier, 0 (lowest) through 5.
///
/// An unset level is modelled as `Option<Level>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    /// Highest recognized level.
    pub const MAX: u8 = 5;

    /// All six levels in ascending order.
    pub const ALL: [Level; 6] = [Level(0), Level(1), Level(2), Level(3), Level(4), Level(5)];

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Level(value))
    }

    /// Parse a cell value; only the exact tokens `"0"` to `"5"` are levels.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "0" => Some(Level(0)),
            "1" => Some(Level(1)),
            "2" => Some(Level(2)),
            "3" => Some(Level(3)),
            "4" => Some(Level(4)),
            "5" => Some(Level(5)),
            _ => None,
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Index into six-element per-level arrays.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Level::new(value).ok_or_else(|| format!("level must be 0-{}, got {}", Level::MAX, value))
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Student Record
// =============================================================================

/// Position of a record in the uploaded roster (0-based, upload order).
pub type RowRef = usize;

/// One normalized roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    /// Class grouping key.
    pub class_id: String,
    /// Seat number as text; may hold non-numeric junk.
    pub seat_number: String,
    /// Student name.
    pub name: String,
    /// Joining or not.
    pub participation: Participation,
    /// Stored level; see [`StudentRecord::effective_level`].
    pub level: Option<Level>,
}

impl StudentRecord {
    pub fn new(
        class_id: impl Into<String>,
        seat_number: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            class_id: class_id.into(),
            seat_number: seat_number.into(),
            name: name.into(),
            participation: Participation::Joining,
            level: None,
        }
    }

    pub fn with_participation(mut self, participation: Participation) -> Self {
        self.participation = participation;
        self
    }

    pub fn with_level(mut self, level: Option<Level>) -> Self {
        self.level = level;
        self
    }

    /// The level that counts for statistics and export.
    ///
    /// Not-joining students never carry a level, whatever is stored.
    pub fn effective_level(&self) -> Option<Level> {
        if self.participation.is_joining() {
            self.level
        } else {
            None
        }
    }
}

/// Seat number as a finite number, if it parses as one.
pub fn seat_value(seat: &str) -> Option<f64> {
    seat.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Seat number that can be stored as a numeric cell without changing its text.
///
/// `"12"` qualifies; `"007"`, `"1e2"` and `" 12"` stay text.
pub fn seat_as_cell_number(seat: &str) -> Option<f64> {
    seat_value(seat).filter(|n| n.to_string() == seat)
}

//! Filter/edit view over a roster.
//!
//! Projects the rows of one class (optionally narrowed by name) into
//! selector-ready [`ViewRow`]s and writes edits back to the store. The view
//! keeps no copies: every edit lands in the [`RosterStore`] immediately, with
//! participation and level always written together.

use serde::{Deserialize, Serialize};

use crate::api::logs::log_warning;
use crate::error::SessionResult;
use crate::models::{Level, Participation, RowRef, StudentRecord};
use crate::roster::RosterStore;

/// One editable line of the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRow {
    /// Position in the roster, used to address edits.
    pub row: RowRef,
    pub seat_number: String,
    pub name: String,
    /// Current participation selector value.
    pub participation: Participation,
    /// Current level selector value; always unset when not joining.
    pub level: Option<Level>,
    /// Whether a level selector is offered for this row.
    pub level_editable: bool,
}

impl ViewRow {
    fn from_record(row: RowRef, record: &StudentRecord) -> Self {
        let joining = record.participation.is_joining();
        Self {
            row,
            seat_number: record.seat_number.clone(),
            name: record.name.clone(),
            participation: record.participation,
            level: record.effective_level(),
            level_editable: joining,
        }
    }
}

/// A participation + level pair written as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowEdit {
    pub participation: Participation,
    #[serde(default)]
    pub level: Option<Level>,
}

impl RowEdit {
    /// Couple the pair: not joining always clears the level.
    pub fn new(participation: Participation, level: Option<Level>) -> Self {
        let level = if participation.is_joining() { level } else { None };
        Self {
            participation,
            level,
        }
    }

    pub fn joining(level: Option<Level>) -> Self {
        Self::new(Participation::Joining, level)
    }

    pub fn not_joining() -> Self {
        Self::new(Participation::NotJoining, None)
    }
}

/// An edit addressed to a roster row, as read from an edits file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressedEdit {
    pub row: RowRef,
    pub participation: Participation,
    #[serde(default)]
    pub level: Option<Level>,
}

impl AddressedEdit {
    pub fn new(row: RowRef, edit: RowEdit) -> Self {
        Self {
            row,
            participation: edit.participation,
            level: edit.level,
        }
    }

    pub fn edit(&self) -> RowEdit {
        RowEdit::new(self.participation, self.level)
    }
}

/// Selector options for the level column, unset first.
pub fn level_options() -> Vec<Option<Level>> {
    std::iter::once(None)
        .chain(Level::ALL.iter().copied().map(Some))
        .collect()
}

/// Rows of `class_id` matching `name_filter`, in roster order.
pub fn project(store: &RosterStore, class_id: &str, name_filter: Option<&str>) -> Vec<ViewRow> {
    store
        .filter(class_id, name_filter)
        .into_iter()
        .map(|(row, record)| ViewRow::from_record(row, record))
        .collect()
}

/// Write one edit back to the store and return the refreshed row.
pub fn apply_edit(store: &mut RosterStore, row: RowRef, edit: RowEdit) -> SessionResult<ViewRow> {
    // Deserialized edits bypass RowEdit::new.
    let edit = RowEdit::new(edit.participation, edit.level);
    let record = store.apply_edit(row, edit.participation, edit.level)?;
    Ok(ViewRow::from_record(row, record))
}

/// Apply edits in order; stops at the first unknown row.
///
/// Edits before the failing one stay applied.
pub fn apply_edits(store: &mut RosterStore, edits: &[AddressedEdit]) -> SessionResult<usize> {
    for (applied, e) in edits.iter().enumerate() {
        if let Err(err) = apply_edit(store, e.row, e.edit()) {
            log_warning(format!("Edit #{} rejected after {} applied: {}", applied + 1, applied, err));
            return Err(err);
        }
    }
    Ok(edits.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    fn store() -> RosterStore {
        RosterStore::new(vec![
            StudentRecord::new("1A", "5", "Alice").with_level(Level::new(3)),
            StudentRecord::new("1A", "2", "Bob")
                .with_participation(Participation::NotJoining)
                .with_level(Level::new(2)),
            StudentRecord::new("2B", "1", "Cara"),
        ])
    }

    #[test]
    fn test_project_forces_level_off_for_not_joining() {
        let rows = project(&store(), "1A", None);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].level, Level::new(3));
        assert!(rows[0].level_editable);
        assert_eq!(rows[1].participation, Participation::NotJoining);
        assert_eq!(rows[1].level, None);
        assert!(!rows[1].level_editable);
    }

    #[test]
    fn test_row_edit_couples_fields() {
        let edit = RowEdit::new(Participation::NotJoining, Level::new(4));
        assert_eq!(edit.level, None);

        let edit = RowEdit::joining(Level::new(4));
        assert_eq!(edit.level, Level::new(4));
    }

    #[test]
    fn test_apply_edit_writes_pair() {
        let mut s = store();

        let row = apply_edit(&mut s, 0, RowEdit::not_joining()).unwrap();
        assert_eq!(row.participation, Participation::NotJoining);
        assert_eq!(s.get(0).unwrap().level, None);

        // Hand-built edit with a level is re-coupled before writing
        let raw = RowEdit {
            participation: Participation::NotJoining,
            level: Level::new(5),
        };
        apply_edit(&mut s, 2, raw).unwrap();
        assert_eq!(s.get(2).unwrap().level, None);
    }

    #[test]
    fn test_apply_edits_stops_at_unknown_row() {
        let mut s = store();
        let edits = vec![
            AddressedEdit::new(1, RowEdit::joining(Level::new(1))),
            AddressedEdit::new(7, RowEdit::not_joining()),
            AddressedEdit::new(2, RowEdit::not_joining()),
        ];

        let err = apply_edits(&mut s, &edits).unwrap_err();
        assert!(matches!(err, SessionError::RowNotFound(7)));
        assert_eq!(s.get(1).unwrap().participation, Participation::Joining);
        assert_eq!(s.get(2).unwrap().participation, Participation::Joining);
    }

    #[test]
    fn test_edits_file_format() {
        let json = r#"[{"row": 0, "participation": "不參加"}, {"row": 2, "participation": "joining", "level": 4}]"#;
        let edits: Vec<AddressedEdit> = serde_json::from_str(json).unwrap();

        assert_eq!(edits[0].edit(), RowEdit::not_joining());
        assert_eq!(edits[1].row, 2);
        assert_eq!(edits[1].edit().level, Level::new(4));
    }

    #[test]
    fn test_level_options() {
        let opts = level_options();
        assert_eq!(opts.len(), 7);
        assert_eq!(opts[0], None);
        assert_eq!(opts[6], Level::new(5));
    }
}

//! In-memory roster store.
//!
//! Owns every [`StudentRecord`] of one upload, indexed by upload position.
//! Only `participation` and `level` ever change after construction.

use std::collections::BTreeSet;

use crate::error::{SessionError, SessionResult};
use crate::models::{Level, Participation, RowRef, StudentRecord};

/// Mutable, ordered collection of normalized records.
#[derive(Debug, Clone, Default)]
pub struct RosterStore {
    records: Vec<StudentRecord>,
}

/// The records of one class, in upload order.
///
/// Derived on demand; never stored.
#[derive(Debug, Clone)]
pub struct ClassRoster<'a> {
    pub class_id: &'a str,
    pub records: Vec<&'a StudentRecord>,
}

impl ClassRoster<'_> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RosterStore {
    pub fn new(records: Vec<StudentRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn get(&self, row: RowRef) -> Option<&StudentRecord> {
        self.records.get(row)
    }

    /// Sorted distinct non-blank class ids.
    pub fn list_classes(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| !r.class_id.trim().is_empty())
            .map(|r| r.class_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Records of `class_id` whose name contains `name_substring`
    /// (case-insensitive), in upload order.
    ///
    /// A blank or absent substring applies no name filter.
    pub fn filter(
        &self,
        class_id: &str,
        name_substring: Option<&str>,
    ) -> Vec<(RowRef, &StudentRecord)> {
        let needle = name_substring
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.class_id == class_id)
            .filter(|(_, r)| match &needle {
                Some(n) => r.name.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .collect()
    }

    /// All records of one class.
    pub fn class_roster<'a>(&'a self, class_id: &'a str) -> ClassRoster<'a> {
        ClassRoster {
            class_id,
            records: self
                .records
                .iter()
                .filter(|r| r.class_id == class_id)
                .collect(),
        }
    }

    /// Overwrite participation and level of exactly one record.
    pub fn apply_edit(
        &mut self,
        row: RowRef,
        participation: Participation,
        level: Option<Level>,
    ) -> SessionResult<&StudentRecord> {
        let record = self
            .records
            .get_mut(row)
            .ok_or(SessionError::RowNotFound(row))?;
        record.participation = participation;
        record.level = level;
        Ok(record)
    }
}

impl From<Vec<StudentRecord>> for RosterStore {
    fn from(records: Vec<StudentRecord>) -> Self {
        Self::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RosterStore {
        RosterStore::new(vec![
            StudentRecord::new("2B", "1", "Alice Chen"),
            StudentRecord::new("1A", "2", "Bob Lin"),
            StudentRecord::new("", "3", "Nobody"),
            StudentRecord::new("1A", "1", "ALICE Wu"),
            StudentRecord::new("  ", "4", "Blank"),
        ])
    }

    #[test]
    fn test_list_classes_sorted_and_non_blank() {
        assert_eq!(store().list_classes(), vec!["1A", "2B"]);
    }

    #[test]
    fn test_filter_by_class_preserves_order() {
        let s = store();
        let rows: Vec<RowRef> = s.filter("1A", None).into_iter().map(|(i, _)| i).collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_filter_name_case_insensitive() {
        let s = store();
        let hits = s.filter("1A", Some(" alice "));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.name, "ALICE Wu");

        // Blank substring means no name filter
        assert_eq!(s.filter("1A", Some("   ")).len(), 2);
        // Class match is exact
        assert!(s.filter("1a", None).is_empty());
    }

    #[test]
    fn test_apply_edit_touches_only_target() {
        let mut s = store();
        let before = s.records().to_vec();

        s.apply_edit(1, Participation::NotJoining, None).unwrap();

        assert_eq!(s.get(1).unwrap().participation, Participation::NotJoining);
        assert_eq!(s.get(1).unwrap().name, "Bob Lin");
        for (i, (a, b)) in before.iter().zip(s.records()).enumerate() {
            if i != 1 {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_apply_edit_unknown_row() {
        let mut s = store();
        let err = s.apply_edit(99, Participation::Joining, Level::new(1)).unwrap_err();
        assert!(matches!(err, SessionError::RowNotFound(99)));
    }

    #[test]
    fn test_class_roster() {
        let s = store();
        let roster = s.class_roster("1A");
        assert_eq!(roster.len(), 2);
        assert!(s.class_roster("9Z").is_empty());
    }
}

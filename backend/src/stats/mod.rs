//! Per-class participation and level tallies.
//!
//! Pure functions of the roster at call time; nothing is cached.

use serde::Serialize;

use crate::models::Level;
use crate::roster::{ClassRoster, RosterStore};

/// Live tallies for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub class_id: String,
    /// Students in the class.
    pub total: usize,
    /// Students joining.
    pub joined: usize,
    /// Students not joining.
    pub not_joined: usize,
    /// Joining students per level, index = level.
    ///
    /// Joining students without a level count in no bucket.
    pub level_counts: [usize; 6],
}

impl ClassStats {
    pub fn level_count(&self, level: Level) -> usize {
        self.level_counts[level.index()]
    }

    /// Levels 3 through 5 combined.
    pub fn upper_levels(&self) -> usize {
        self.level_counts[3..].iter().sum()
    }

    /// Joining students whose level is not chosen yet.
    pub fn unleveled(&self) -> usize {
        self.joined - self.level_counts.iter().sum::<usize>()
    }
}

/// Tally one class.
pub fn class_stats(roster: &ClassRoster<'_>) -> ClassStats {
    let mut stats = ClassStats {
        class_id: roster.class_id.to_string(),
        total: roster.len(),
        joined: 0,
        not_joined: 0,
        level_counts: [0; 6],
    };

    for record in &roster.records {
        if record.participation.is_joining() {
            stats.joined += 1;
        } else {
            stats.not_joined += 1;
        }
        if let Some(level) = record.effective_level() {
            stats.level_counts[level.index()] += 1;
        }
    }

    stats
}

/// Tally every class of the roster, in class order.
pub fn all_class_stats(store: &RosterStore) -> Vec<ClassStats> {
    store
        .list_classes()
        .iter()
        .map(|class_id| class_stats(&store.class_roster(class_id)))
        .collect()
}

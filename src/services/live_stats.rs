//! Live stat source consumed by the merger.
//!
//! The real source is the game client runtime; [`MemoryLiveStats`] is an
//! in-memory stand-in that can be seeded from a previously saved achievements
//! file.

use crate::services::persistence::PersistedAchievementRecord;
use indexmap::IndexMap;

/// Unlock state reported for one achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockState {
    pub achieved: bool,
    /// Unix epoch seconds, 0 when unknown.
    pub unlock_epoch: i64,
}

/// Per-identifier lookup of live achievement and stat values.
///
/// Every getter returns `None` for identifiers the source does not know.
#[cfg_attr(test, mockall::automock)]
pub trait LiveStats {
    fn achievement(&self, id: &str) -> Option<UnlockState>;

    fn int_stat(&self, id: &str) -> Option<i32>;

    fn float_stat(&self, id: &str) -> Option<f32>;

    /// Returns false if the id is unknown.
    fn set_int_stat(&mut self, id: &str, value: i32) -> bool;

    /// Returns false if the id is unknown.
    fn set_float_stat(&mut self, id: &str, value: f32) -> bool;
}

/// In-memory live stats.
#[derive(Debug, Clone, Default)]
pub struct MemoryLiveStats {
    achievements: IndexMap<String, UnlockState>,
    int_stats: IndexMap<String, i32>,
    float_stats: IndexMap<String, f32>,
}

impl MemoryLiveStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from saved records: every id is known, and the saved ones are achieved.
    ///
    /// `known_ids` lists every achievement the schema defines so entries
    /// missing from the file report as locked instead of unknown.
    pub fn from_persisted<'a, I>(records: &[PersistedAchievementRecord], known_ids: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut live = Self::new();
        for id in known_ids {
            live.insert_achievement(id, false, 0);
        }
        for record in records {
            live.insert_achievement(&record.id, record.achieved, record.unlock_time);
        }
        live
    }

    pub fn insert_achievement(&mut self, id: &str, achieved: bool, unlock_epoch: i64) {
        self.achievements.insert(
            id.to_string(),
            UnlockState {
                achieved,
                unlock_epoch,
            },
        );
    }

    pub fn insert_int_stat(&mut self, id: &str, value: i32) {
        self.int_stats.insert(id.to_string(), value);
    }

    pub fn insert_float_stat(&mut self, id: &str, value: f32) {
        self.float_stats.insert(id.to_string(), value);
    }
}

impl LiveStats for MemoryLiveStats {
    fn achievement(&self, id: &str) -> Option<UnlockState> {
        self.achievements.get(id).copied()
    }

    fn int_stat(&self, id: &str) -> Option<i32> {
        self.int_stats.get(id).copied()
    }

    fn float_stat(&self, id: &str) -> Option<f32> {
        self.float_stats.get(id).copied()
    }

    fn set_int_stat(&mut self, id: &str, value: i32) -> bool {
        match self.int_stats.get_mut(id) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn set_float_stat(&mut self, id: &str, value: f32) -> bool {
        match self.float_stats.get_mut(id) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

use super::records::{AchievementInfo, StatInfo};
use crate::services::{AchievementFilter, IconQueue, SchemaDefinitions};

/// Single source of truth for one achievement-editing session.
///
/// # Thread Safety
///
/// `AppState` is wrapped in `Arc<RwLock<AppState>>` by [`crate::state::StateManager`].
/// Never access it directly - use [`StateManager`](crate::state::StateManager):
/// - [`read()`](crate::state::StateManager::read) for read-only access
/// - [`update()`](crate::state::StateManager::update) for mutations with change events
///
/// # Related Types
///
/// - [`crate::services::SchemaDefinitions`]: definitions of the loaded schema
/// - [`crate::models::AchievementInfo`] / [`crate::models::StatInfo`]: runtime records
#[derive(Clone, Debug)]
pub struct AppState {
    // Loaded game
    pub game_id: Option<u32>,
    pub language: String,
    pub definitions: SchemaDefinitions,

    // Runtime records, rebuilt on every refresh
    pub achievements: Vec<AchievementInfo>,
    pub stats: Vec<StatInfo>,
    pub filter: AchievementFilter,

    // Icons
    pub icons: IconQueue,
    pub is_fetching_icons: bool,

    // Shell-facing status line
    pub status: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            game_id: None,
            language: "english".to_string(),
            definitions: SchemaDefinitions::new(),
            achievements: Vec::new(),
            stats: Vec::new(),
            filter: AchievementFilter::default(),
            icons: IconQueue::new(0),
            is_fetching_icons: false,
            status: String::new(),
        }
    }
}

impl AppState {
    /// A schema has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.game_id.is_some() && !self.definitions.is_empty()
    }

    /// Achievements selected for saving, in list order.
    pub fn checked_snapshot(&self) -> Vec<AchievementInfo> {
        self.achievements
            .iter()
            .filter(|a| a.checked)
            .cloned()
            .collect()
    }

    /// Stats with a pending edit.
    pub fn modified_stats(&self) -> Vec<StatInfo> {
        self.stats
            .iter()
            .filter(|s| s.is_modified())
            .cloned()
            .collect()
    }

    /// Returns (checked, total) achievement counts.
    pub fn achievement_counts(&self) -> (usize, usize) {
        (
            self.achievements.iter().filter(|a| a.checked).count(),
            self.achievements.len(),
        )
    }

    /// Set the checked flag of one achievement.
    ///
    /// Returns false if the id is unknown or the achievement is protected.
    pub fn set_checked(&mut self, id: &str, checked: bool) -> bool {
        match self.achievements.iter_mut().find(|a| a.id == id) {
            Some(achievement) if !achievement.is_protected() => {
                achievement.checked = checked;
                true
            }
            _ => false,
        }
    }

    pub fn check_all(&mut self) {
        self.for_each_editable(|a| a.checked = true);
    }

    pub fn uncheck_all(&mut self) {
        self.for_each_editable(|a| a.checked = false);
    }

    pub fn invert_checked(&mut self) {
        self.for_each_editable(|a| a.checked = !a.checked);
    }

    fn for_each_editable<F: FnMut(&mut AchievementInfo)>(&mut self, mut f: F) {
        self.achievements
            .iter_mut()
            .filter(|a| !a.is_protected())
            .for_each(|a| f(a));
    }

    /// Drop every loaded record and definition.
    pub fn reset_session(&mut self) {
        self.game_id = None;
        self.definitions.clear();
        self.achievements.clear();
        self.stats.clear();
        self.icons.clear();
        self.is_fetching_icons = false;
    }
}

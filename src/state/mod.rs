// State management module
//
// This module provides the StateManager which wraps AppState with thread-safe access
// using Arc<RwLock<T>> and emits change events for the presentation shell.

use crate::models::{AppState, StatEditError};
use crate::schema::{SchemaNode, load_schema_file, schema_path};
use crate::services::{
    AchievementFilter, CommitError, DefinitionError, IconCompletion, IconFetcher, IconOutcome,
    IconRequest, LiveStats, WriteError, commit_stats, drain_icons, refresh_achievements,
    refresh_stats, write_achievements,
};
use camino::Utf8Path;
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, mpsc};

/// Change events emitted when state is modified
///
/// These events notify the shell about state changes without requiring it to
/// poll the state.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// Definitions were rebuilt from a schema
    SchemaLoaded {
        game_id: u32,
        stats: usize,
        achievements: usize,
    },

    /// Schema missing, unreadable or malformed; nothing is loaded
    SchemaUnavailable { game_id: u32, reason: String },

    /// Schema uses a format this build does not understand
    SchemaIncompatible { game_id: u32, message: String },

    /// Achievement records were rebuilt
    AchievementsRefreshed { shown: usize },

    /// Stat records were rebuilt
    StatsRefreshed { count: usize },

    /// The checked selection changed
    CheckedChanged { checked: usize, total: usize },

    /// An icon finished downloading (or fell back to the placeholder)
    IconResolved {
        achievement_id: String,
        image_index: usize,
    },

    /// The icon queue drained
    IconsIdle,

    /// Checked achievements were written to disk
    AchievementsSaved { game_id: u32, count: usize },

    /// Writing achievements failed
    SaveFailed { message: String },

    /// Status line text changed
    StatusChanged { status: String },

    /// Session has been reset
    StateReset,
}

/// Fields watched by change detection.
///
/// Cheaper than cloning the whole state, which owns icon image data.
#[derive(Debug, PartialEq)]
struct Observed {
    status: String,
    is_fetching_icons: bool,
    checked: usize,
    total: usize,
}

impl Observed {
    fn of(state: &AppState) -> Self {
        let (checked, total) = state.achievement_counts();
        Self {
            status: state.status.clone(),
            is_fetching_icons: state.is_fetching_icons,
            checked,
            total,
        }
    }
}

/// Thread-safe state manager with event emission
///
/// This is the central coordinator that:
/// - Provides thread-safe access to [`AppState`] via `Arc<RwLock<T>>`
/// - Runs schema loads, refreshes and saves against the state
/// - Emits [`StateChange`] events over a tokio broadcast channel
///
/// # Usage
///
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct StateManager {
    /// The session state protected by RwLock for thread-safe access
    state: Arc<RwLock<AppState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Get a clone of the current state
    pub fn snapshot(&self) -> AppState {
        self.state.read().unwrap().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let loaded = state_manager.read(|state| state.is_loaded());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// # Returns
    /// A vector of StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        self.update_with(update_fn).1
    }

    /// Like [`update()`](Self::update), also returning the closure's result
    fn update_with<F, R>(&self, update_fn: F) -> (R, Vec<StateChange>)
    where
        F: FnOnce(&mut AppState) -> R,
    {
        let mut state = self.state.write().unwrap();
        let before = Observed::of(&state);

        let result = update_fn(&mut state);

        let changes = Self::detect_changes(&before, &Observed::of(&state));
        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.state_tx.send(change.clone());
        }

        (result, changes)
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, change: StateChange, changes: &mut Vec<StateChange>) {
        let _ = self.state_tx.send(change.clone());
        changes.push(change);
    }

    fn detect_changes(old: &Observed, new: &Observed) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.checked != new.checked || old.total != new.total {
            changes.push(StateChange::CheckedChanged {
                checked: new.checked,
                total: new.total,
            });
        }

        if old.is_fetching_icons && !new.is_fetching_icons {
            changes.push(StateChange::IconsIdle);
        }

        if old.status != new.status {
            changes.push(StateChange::StatusChanged {
                status: new.status.clone(),
            });
        }

        changes
    }

    /// Rebuild definitions from a parsed schema tree.
    ///
    /// The previous session is dropped first, so a failed load leaves no
    /// definitions or records behind.
    pub fn load_schema(
        &self,
        root: &SchemaNode,
        game_id: u32,
        language: &str,
    ) -> Result<Vec<StateChange>, DefinitionError> {
        let (result, mut changes) = self.update_with(|state| {
            state.reset_session();
            state.icons.reset_for_game(game_id);
            state.language = language.to_string();

            let result = state.definitions.build(root, game_id, language);
            state.status = match &result {
                Ok(()) => {
                    state.game_id = Some(game_id);
                    format!(
                        "Loaded schema for game {}: {} achievements, {} stats",
                        game_id,
                        state.definitions.achievements().len(),
                        state.definitions.stats().len()
                    )
                }
                Err(e) if e.is_fatal() => format!("Unexpected schema format: {}", e),
                Err(e) => format!("Failed to load schema: {}", e),
            };
            result.map(|()| {
                (
                    state.definitions.stats().len(),
                    state.definitions.achievements().len(),
                )
            })
        });

        match &result {
            Ok((stats, achievements)) => {
                let (stats, achievements) = (*stats, *achievements);
                self.emit(
                    StateChange::SchemaLoaded {
                        game_id,
                        stats,
                        achievements,
                    },
                    &mut changes,
                );
            }
            Err(e) if e.is_fatal() => self.emit(
                StateChange::SchemaIncompatible {
                    game_id,
                    message: e.to_string(),
                },
                &mut changes,
            ),
            Err(e) => self.emit(
                StateChange::SchemaUnavailable {
                    game_id,
                    reason: e.to_string(),
                },
                &mut changes,
            ),
        }

        result.map(|_| changes)
    }

    /// Read `UserGameStatsSchema_<game>.bin` from the client install and load it.
    ///
    /// Missing or unparseable files surface as
    /// [`DefinitionError::SchemaUnavailable`].
    pub fn load_schema_from_install(
        &self,
        install_dir: &Utf8Path,
        game_id: u32,
        language: &str,
    ) -> Result<Vec<StateChange>, DefinitionError> {
        let path = schema_path(install_dir, game_id);
        match load_schema_file(&path) {
            Ok(root) => self.load_schema(&root, game_id, language),
            Err(e) => {
                tracing::warn!("Schema for game {} unavailable: {}", game_id, e);
                let error = DefinitionError::SchemaUnavailable {
                    game_id,
                    reason: e.to_string(),
                };
                let mut changes = self.update(|state| {
                    state.reset_session();
                    state.status = format!("Failed to load schema: {}", error);
                });
                self.emit(
                    StateChange::SchemaUnavailable {
                        game_id,
                        reason: e.to_string(),
                    },
                    &mut changes,
                );
                Err(error)
            }
        }
    }

    /// Rebuild achievement and stat records from the live source.
    pub fn refresh<L: LiveStats + ?Sized>(&self, live: &L) -> Vec<StateChange> {
        let (counts, mut changes) = self.update_with(|state| {
            state.achievements =
                refresh_achievements(state.definitions.achievements(), live, &state.filter);
            state.stats = refresh_stats(state.definitions.stats(), live);
            state.status = format!(
                "Retrieved {} achievements and {} statistics",
                state.achievements.len(),
                state.stats.len()
            );
            (state.achievements.len(), state.stats.len())
        });

        tracing::info!(
            "Refreshed {} achievements and {} stats",
            counts.0,
            counts.1
        );

        self.emit(
            StateChange::AchievementsRefreshed { shown: counts.0 },
            &mut changes,
        );
        self.emit(StateChange::StatsRefreshed { count: counts.1 }, &mut changes);
        changes
    }

    /// Replace the display filter and refresh.
    pub fn set_filter<L: LiveStats + ?Sized>(
        &self,
        filter: AchievementFilter,
        live: &L,
    ) -> Vec<StateChange> {
        self.update(|state| state.filter = filter);
        self.refresh(live)
    }

    pub fn set_checked(&self, id: &str, checked: bool) -> bool {
        self.update_with(|state| state.set_checked(id, checked)).0
    }

    pub fn check_all(&self) -> Vec<StateChange> {
        self.update(AppState::check_all)
    }

    pub fn uncheck_all(&self) -> Vec<StateChange> {
        self.update(AppState::uncheck_all)
    }

    pub fn invert_checked(&self) -> Vec<StateChange> {
        self.update(AppState::invert_checked)
    }

    /// Apply a user edit to a stat.
    pub fn edit_stat(&self, id: &str, input: &str) -> Result<(), StatEditError> {
        let (result, _) = self.update_with(|state| {
            let stat = state
                .stats
                .iter_mut()
                .find(|s| s.id() == id)
                .ok_or_else(|| StatEditError::UnknownStat(id.to_string()))?;
            let value = stat.parse_value(input)?;
            stat.set_value(value)
        });
        if let Err(e) = &result {
            tracing::warn!("Rejected edit of stat '{}': {}", id, e);
        }
        result
    }

    /// Queue icons for every record that has none yet.
    pub fn enqueue_icons(&self) -> Vec<StateChange> {
        self.update(|state| {
            let AppState {
                achievements,
                icons,
                ..
            } = state;
            for achievement in achievements.iter_mut().filter(|a| a.image_index.is_none()) {
                icons.enqueue(achievement);
            }
            state.is_fetching_icons = !state.icons.is_empty() || state.icons.is_busy();
        })
    }

    /// Next icon to fetch, or `None` if the queue is empty or a fetch is in flight.
    pub fn next_icon_request(&self) -> Option<IconRequest> {
        self.update_with(|state| {
            let request = state.icons.dequeue_next();
            if request.is_none() && !state.icons.is_busy() {
                state.is_fetching_icons = false;
            }
            request
        })
        .0
    }

    /// Register a finished fetch and hand its icon to the matching records.
    pub fn apply_icon_completion(&self, completion: IconCompletion) -> IconOutcome {
        let (outcome, mut changes) = self.update_with(|state| {
            let outcome = state.icons.complete(completion);
            // Slot 0 means the icon was not cached for the loaded game
            if outcome.image_index != 0 {
                for achievement in state
                    .achievements
                    .iter_mut()
                    .filter(|a| a.image_index.is_none() && a.icon_key() == outcome.icon_key)
                {
                    achievement.image_index = Some(outcome.image_index);
                }
            }
            if outcome.idle {
                state.is_fetching_icons = false;
            }
            outcome
        });

        if !outcome.stale {
            self.emit(
                StateChange::IconResolved {
                    achievement_id: outcome.achievement_id.clone(),
                    image_index: outcome.image_index,
                },
                &mut changes,
            );
        }
        outcome
    }

    /// Drain the icon queue through `fetcher`, one request at a time.
    ///
    /// Returns the number of completed fetches.
    pub async fn fetch_icons<F: IconFetcher>(&self, fetcher: &F) -> usize {
        let (request_tx, request_rx) = mpsc::channel(1);
        let (completion_tx, mut completion_rx) = mpsc::channel(1);

        let owner = async move {
            let mut completed = 0;
            while let Some(request) = self.next_icon_request() {
                if request_tx.send(request).await.is_err() {
                    break;
                }
                let Some(completion) = completion_rx.recv().await else {
                    break;
                };
                self.apply_icon_completion(completion);
                completed += 1;
            }
            completed
        };

        let (completed, ()) = tokio::join!(owner, drain_icons(fetcher, request_rx, completion_tx));
        tracing::debug!("Icon fetching finished after {} requests", completed);
        completed
    }

    /// Write the checked achievements of the loaded game under `base_path`.
    pub fn save_achievements(&self, base_path: &Utf8Path) -> Result<usize, WriteError> {
        let (game_id, checked) = self.read(|s| (s.game_id, s.checked_snapshot()));
        let Some(game_id) = game_id else {
            tracing::warn!("Save requested with no schema loaded");
            return Ok(0);
        };

        match write_achievements(&checked, game_id, base_path) {
            Ok(count) => {
                let mut changes = self.update(|state| {
                    state.status = format!("Saved {} achievements for game {}", count, game_id);
                });
                self.emit(StateChange::AchievementsSaved { game_id, count }, &mut changes);
                Ok(count)
            }
            Err(e) => {
                tracing::error!("Failed to save achievements: {}", e);
                let mut changes = self.update(|state| {
                    state.status = format!("Failed to save achievements: {}", e);
                });
                self.emit(
                    StateChange::SaveFailed {
                        message: e.to_string(),
                    },
                    &mut changes,
                );
                Err(e)
            }
        }
    }

    /// Hand modified stats to the (disabled) remote commit.
    pub fn commit_stats(&self) -> Result<usize, CommitError> {
        let modified = self.read(AppState::modified_stats);
        commit_stats(&modified)
    }

    /// Drop the loaded session
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.reset_session();
            state.status.clear();
        });
        self.emit(StateChange::StateReset, &mut changes);
        changes
    }

    /// Get an Arc reference to the state for use in worker threads
    pub fn state_arc(&self) -> Arc<RwLock<AppState>> {
        Arc::clone(&self.state)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across threads
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}

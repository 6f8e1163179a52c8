//! Data models for statkeeper.
//!
//! - [`StatDefinition`] / [`AchievementDefinition`]: immutable, schema-derived descriptions
//! - [`AchievementInfo`] / [`StatInfo`]: runtime records combining a definition with live values
//! - [`AppState`]: the session state held by [`StateManager`](crate::state::StateManager)
//! - [`UserConfig`]: user settings loaded from `statkeeper.yaml`
//!
//! Stats are modelled as sum types over the integer and float variants, so
//! every dispatch is an exhaustive `match`.

pub mod app_state;
pub mod config;
pub mod definitions;
pub mod records;

pub use app_state::AppState;
pub use config::{DEFAULT_ICON_CDN_BASE, DEFAULT_SAVE_BASE_PATH, Settings, UserConfig};
pub use definitions::{
    AchievementDefinition, FloatStatDefinition, IntegerStatDefinition, PROTECTED_PERMISSION_MASK,
    StatDefinition, StatKind, is_protected,
};
pub use records::{
    AchievementInfo, FloatStatInfo, IntStatInfo, StatEditError, StatInfo, StatValue, TOKEN_MARKER,
};

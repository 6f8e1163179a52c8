// statkeeper - achievement and stat schema engine for a game-platform client
//
// This is the library crate containing the core business logic and data structures.
// The binary crate (main.rs) provides a command-line entry point.

pub mod config;
pub mod logging;
pub mod models;
pub mod schema;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{AchievementInfo, AppState, StatInfo, UserConfig};
pub use schema::SchemaNode;
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

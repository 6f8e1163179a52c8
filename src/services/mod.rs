//! Services module - Schema ingestion, state merging and local persistence.
//!
//! The services are **framework-agnostic** and have no dependencies on any UI
//! layer. The presentation shell supplies raw inputs (schema blobs, a live stat
//! source) and renders the typed records these services produce.
//!
//! # Components
//!
//! - [`SchemaDefinitions`]: walks a schema tree for one game and builds the
//!   ordered stat and achievement definitions. Unknown stat type tags abort the
//!   pass with [`DefinitionError::UnknownStatType`].
//!
//! - [`refresh_achievements`] / [`refresh_stats`]: combine definitions with a
//!   [`LiveStats`] source into runtime records, applying the display
//!   [`AchievementFilter`].
//!
//! - [`IconQueue`]: FIFO of achievements waiting for an icon, drained one
//!   request at a time by an [`IconFetcher`] (see [`drain_icons`]).
//!
//! - [`write_achievements`]: writes the checked achievements of a game to
//!   `<base>/<game id>/achievements.ini`. [`PersistedFileReader`] reads such
//!   files back.
//!
//! - [`commit_stats`]: remote commit contract, disabled.
//!
//! # Usage Example
//!
//! ```ignore
//! use statkeeper::schema::load_schema_file;
//! use statkeeper::services::{AchievementFilter, SchemaDefinitions, refresh_achievements};
//!
//! let root = load_schema_file(&schema_path)?;
//! let mut definitions = SchemaDefinitions::new();
//! definitions.build(&root, 480, "english")?;
//!
//! let records = refresh_achievements(
//!     definitions.achievements(),
//!     &live_stats,
//!     &AchievementFilter::default(),
//! );
//! ```

pub mod commit;
pub mod definitions;
pub mod icons;
pub mod live_stats;
pub mod merger;
pub mod persistence;

pub use commit::{CommitError, commit_stats};
pub use definitions::{DefinitionError, SchemaDefinitions};
pub use icons::{
    HttpIconFetcher, IconCache, IconCompletion, IconError, IconFetcher, IconImage, IconOutcome,
    IconQueue, IconRequest, ImageFormat, decode_icon, drain_icons,
};
pub use live_stats::{LiveStats, MemoryLiveStats, UnlockState};
pub use merger::{AchievementFilter, refresh_achievements, refresh_stats};
pub use persistence::{
    ACHIEVEMENTS_FILE_NAME, PersistedAchievementRecord, PersistedFileReader, WriteError,
    achievements_path, render_achievements, write_achievements,
};

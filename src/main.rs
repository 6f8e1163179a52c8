//! statkeeper - achievement and stat schema engine
//!
//! Main entry point for the command-line tool.
//!
//! # Usage
//!
//! ```text
//! statkeeper <game id> [--save] [--icons]
//! ```
//!
//! # Execution Flow
//!
//! 1. Load `statkeeper.yaml` from the `statkeeper` config directory
//! 2. Initialize logging → `<log dir>/statkeeper.<date>`
//! 3. Load `UserGameStatsSchema_<game id>.bin` from the configured install path
//! 4. Seed live state from `steam_settings/saves/<game id>/achievements.ini`
//! 5. Refresh records and log a summary
//! 6. `--icons`: fetch every icon from the CDN on a tokio runtime
//! 7. `--save`: rewrite the saved file from the checked achievements

use anyhow::{Context, Result, bail};
use camino::Utf8Path;
use statkeeper::models::DEFAULT_SAVE_BASE_PATH;
use statkeeper::services::{
    HttpIconFetcher, MemoryLiveStats, PersistedFileReader, achievements_path,
};
use statkeeper::{APP_NAME, ConfigManager, StateManager, VERSION};

/// Parsed command line
struct Args {
    game_id: u32,
    save: bool,
    icons: bool,
}

fn parse_args() -> Result<Args> {
    let mut game_id = None;
    let mut save = false;
    let mut icons = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--save" => save = true,
            "--icons" => icons = true,
            other => {
                let id = other
                    .parse::<u32>()
                    .with_context(|| format!("Invalid game id: {}", other))?;
                game_id = Some(id);
            }
        }
    }

    let Some(game_id) = game_id else {
        bail!("Usage: {} <game id> [--save] [--icons]", APP_NAME);
    };
    Ok(Args {
        game_id,
        save,
        icons,
    })
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let config_manager = ConfigManager::new("statkeeper")?;
    let user_config = config_manager.load_user_config()?;
    let settings = &user_config.settings;

    let _guard = statkeeper::logging::setup_logging_from_settings(settings, true)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    if !settings.has_install_path() {
        bail!(
            "No install path configured, set 'Steam Install Path' in {}",
            config_manager.user_config_path()
        );
    }

    let state_manager = StateManager::new();
    state_manager
        .load_schema_from_install(
            Utf8Path::new(&settings.steam_install_path),
            args.game_id,
            &settings.language,
        )
        .with_context(|| format!("Failed to load schema for game {}", args.game_id))?;

    let base_path = Utf8Path::new(DEFAULT_SAVE_BASE_PATH);
    let saved = PersistedFileReader::new()
        .read(&achievements_path(base_path, args.game_id))
        .context("Failed to read saved achievements")?;
    let live = state_manager.read(|state| {
        MemoryLiveStats::from_persisted(
            &saved,
            state.definitions.achievements().iter().map(|a| a.id.as_str()),
        )
    });

    state_manager.refresh(&live);
    let (checked, total) = state_manager.read(|state| state.achievement_counts());
    let stats = state_manager.read(|state| state.stats.len());
    tracing::info!(
        "Game {}: {}/{} achievements unlocked, {} stats",
        args.game_id,
        checked,
        total,
        stats
    );

    if args.icons {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let fetcher = HttpIconFetcher::new(settings.icon_cdn_base.clone());

        state_manager.enqueue_icons();
        let fetched = runtime.block_on(state_manager.fetch_icons(&fetcher));
        let cached = state_manager.read(|state| state.icons.cache().len());
        tracing::info!("Fetched {} icons, {} cached", fetched, cached);
    }

    if args.save {
        let count = state_manager.save_achievements(base_path)?;
        tracing::info!("Saved {} achievements to {}", count, base_path);
    }

    tracing::info!("Done");
    Ok(())
}

use crate::models::{
    AchievementDefinition, FloatStatDefinition, IntegerStatDefinition, StatDefinition, StatKind,
};
use crate::schema::{SchemaNode, resolve_localized};
use thiserror::Error;

/// Errors that can occur while building definitions from a schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    /// Schema missing, unreadable or lacking the game's `stats` table.
    #[error("Schema unavailable for game {game_id}: {reason}")]
    SchemaUnavailable { game_id: u32, reason: String },

    /// The schema uses a stat type tag this build does not know.
    #[error("Unknown stat type {raw_type} for stat '{stat_id}' in game {game_id}")]
    UnknownStatType {
        game_id: u32,
        stat_id: String,
        raw_type: i32,
    },
}

impl DefinitionError {
    /// True for schema/format incompatibilities as opposed to missing data.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownStatType { .. })
    }
}

/// Stat and achievement definitions for one loaded schema.
///
/// Every [`build`](Self::build) replaces both collections wholesale. A failed
/// build leaves both empty.
#[derive(Debug, Clone, Default)]
pub struct SchemaDefinitions {
    stats: Vec<StatDefinition>,
    achievements: Vec<AchievementDefinition>,
}

impl SchemaDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &[StatDefinition] {
        &self.stats
    }

    pub fn achievements(&self) -> &[AchievementDefinition] {
        &self.achievements
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty() && self.achievements.is_empty()
    }

    pub fn clear(&mut self) {
        self.stats.clear();
        self.achievements.clear();
    }

    /// Walk `root[game_id]["stats"]` and rebuild all definitions.
    pub fn build(
        &mut self,
        root: &SchemaNode,
        game_id: u32,
        language: &str,
    ) -> Result<(), DefinitionError> {
        self.clear();

        let stats = root.get(&game_id.to_string()).get("stats");
        if !stats.is_valid() || !stats.has_children() {
            tracing::warn!("Schema for game {} has no stats table", game_id);
            return Err(DefinitionError::SchemaUnavailable {
                game_id,
                reason: "missing stats table".to_string(),
            });
        }

        let mut stat_defs = Vec::new();
        let mut achievement_defs = Vec::new();

        for stat in stats.children() {
            let type_node = if stat.get("type_int").is_valid() {
                stat.get("type_int")
            } else {
                stat.get("type")
            };
            let raw_type = type_node.as_integer(0);

            let Some(kind) = StatKind::from_raw(raw_type) else {
                let stat_id = stat.get("name").as_string("");
                tracing::error!(
                    "Unknown stat type {} for '{}' in game {} schema",
                    raw_type,
                    stat_id,
                    game_id
                );
                return Err(DefinitionError::UnknownStatType {
                    game_id,
                    stat_id,
                    raw_type,
                });
            };

            match kind {
                StatKind::Invalid => {
                    tracing::debug!("Skipping placeholder stat entry '{}'", stat.name());
                }
                StatKind::Integer => stat_defs.push(integer_stat(stat, language)),
                StatKind::Float | StatKind::AverageRate => {
                    stat_defs.push(float_stat(stat, language))
                }
                StatKind::Achievements | StatKind::GroupAchievements => {
                    for bits in stat
                        .children()
                        .iter()
                        .filter(|child| child.name().eq_ignore_ascii_case("bits"))
                    {
                        achievement_defs.extend(
                            bits.children()
                                .iter()
                                .map(|bit| achievement(bit, language)),
                        );
                    }
                }
            }
        }

        tracing::info!(
            "Built {} stat and {} achievement definitions for game {}",
            stat_defs.len(),
            achievement_defs.len(),
            game_id
        );

        self.stats = stat_defs;
        self.achievements = achievement_defs;
        Ok(())
    }
}

fn integer_stat(stat: &SchemaNode, language: &str) -> StatDefinition {
    let id = stat.get("name").as_string("");
    let display_name = resolve_localized(stat.get("display").get("name"), language, &id);
    StatDefinition::Integer(IntegerStatDefinition {
        display_name,
        min_value: stat.get("min").as_integer(i32::MIN),
        max_value: stat.get("max").as_integer(i32::MAX),
        max_change: stat.get("maxchange").as_integer(0),
        increment_only: stat.get("incrementonly").as_boolean(false),
        set_by_trusted_game_server: stat.get("bSetByTrustedGS").as_boolean(false),
        default_value: stat.get("default").as_integer(0),
        permission: stat.get("permission").as_integer(0),
        id,
    })
}

fn float_stat(stat: &SchemaNode, language: &str) -> StatDefinition {
    let id = stat.get("name").as_string("");
    let display_name = resolve_localized(stat.get("display").get("name"), language, &id);
    StatDefinition::Float(FloatStatDefinition {
        display_name,
        min_value: stat.get("min").as_float(f32::MIN),
        max_value: stat.get("max").as_float(f32::MAX),
        max_change: stat.get("maxchange").as_float(0.0),
        increment_only: stat.get("incrementonly").as_boolean(false),
        default_value: stat.get("default").as_float(0.0),
        permission: stat.get("permission").as_integer(0),
        id,
    })
}

fn achievement(bit: &SchemaNode, language: &str) -> AchievementDefinition {
    let id = bit.get("name").as_string("");
    let display = bit.get("display");
    let icon_unlocked = display.get("icon").as_string("");
    let icon_locked = match display.get("icon_gray").as_string("") {
        gray if gray.is_empty() => icon_unlocked.clone(),
        gray => gray,
    };

    AchievementDefinition {
        name: resolve_localized(display.get("name"), language, &id),
        description: resolve_localized(display.get("desc"), language, ""),
        icon_unlocked,
        icon_locked,
        is_hidden: display.get("hidden").as_boolean(false),
        permission: bit.get("permission").as_integer(0),
        id,
    }
}

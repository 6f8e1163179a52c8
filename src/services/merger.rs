//! Combines schema definitions with live values into runtime records.

use crate::models::{
    AchievementDefinition, AchievementInfo, FloatStatInfo, IntStatInfo, StatDefinition, StatInfo,
};
use crate::services::live_stats::LiveStats;

/// Display filters for the achievement list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AchievementFilter {
    pub locked_only: bool,
    pub unlocked_only: bool,
    /// Case-insensitive substring matched against name or description.
    pub search: Option<String>,
}

impl AchievementFilter {
    fn accepts_state(&self, is_achieved: bool) -> bool {
        if !self.locked_only && !self.unlocked_only {
            return true;
        }
        (is_achieved && self.unlocked_only) || (!is_achieved && self.locked_only)
    }

    fn accepts_text(&self, definition: &AchievementDefinition) -> bool {
        let Some(term) = self.search.as_deref().filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        definition.name.to_lowercase().contains(&term)
            || definition.description.to_lowercase().contains(&term)
    }
}

/// Build achievement records in definition order.
///
/// Empty ids and ids unknown to the live source are skipped, as are entries
/// rejected by the filter.
pub fn refresh_achievements<L: LiveStats + ?Sized>(
    definitions: &[AchievementDefinition],
    live: &L,
    filter: &AchievementFilter,
) -> Vec<AchievementInfo> {
    let mut records = Vec::new();

    for definition in definitions {
        if definition.id.is_empty() {
            continue;
        }

        let Some(state) = live.achievement(&definition.id) else {
            tracing::debug!("Live source has no achievement '{}'", definition.id);
            continue;
        };

        if !filter.accepts_state(state.achieved) || !filter.accepts_text(definition) {
            continue;
        }

        records.push(AchievementInfo::from_definition(
            definition,
            state.achieved,
            state.unlock_epoch,
        ));
    }

    records
}

/// Build stat records in definition order, skipping ids the live source lacks.
pub fn refresh_stats<L: LiveStats + ?Sized>(
    definitions: &[StatDefinition],
    live: &L,
) -> Vec<StatInfo> {
    let mut records = Vec::new();

    for definition in definitions {
        if definition.id().is_empty() {
            continue;
        }

        let record = match definition {
            StatDefinition::Integer(def) => live.int_stat(&def.id).map(|value| {
                StatInfo::Integer(IntStatInfo {
                    id: def.id.clone(),
                    display_name: def.display_name.clone(),
                    value,
                    original_value: value,
                    increment_only: def.increment_only,
                    permission: def.permission,
                })
            }),
            StatDefinition::Float(def) => live.float_stat(&def.id).map(|value| {
                StatInfo::Float(FloatStatInfo {
                    id: def.id.clone(),
                    display_name: def.display_name.clone(),
                    value,
                    original_value: value,
                    increment_only: def.increment_only,
                    permission: def.permission,
                })
            }),
        };

        match record {
            Some(record) => records.push(record),
            None => tracing::debug!("Live source has no stat '{}'", definition.id()),
        }
    }

    records
}

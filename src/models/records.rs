use super::definitions::{AchievementDefinition, is_protected};
use chrono::{DateTime, Local, TimeZone};
use thiserror::Error;

/// Prefix the schema uses for untranslated token references.
pub const TOKEN_MARKER: char = '#';

/// Runtime view of one achievement, rebuilt on every refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementInfo {
    pub id: String,
    /// Visible name. Token references are replaced by the id.
    pub name: String,
    /// Visible description. Empty when the name was a token reference.
    pub description: String,
    pub icon_unlocked: String,
    pub icon_locked: String,
    pub is_hidden: bool,
    pub permission: i32,

    pub is_achieved: bool,
    /// Unlock time in local time, only for achieved entries with a real epoch.
    pub unlock_time_local: Option<DateTime<Local>>,
    /// Raw unlock epoch seconds, kept whenever the live source reported one.
    pub unlock_time_unix: Option<i64>,
    /// Slot in the icon cache, set once the icon is resolved.
    pub image_index: Option<usize>,
    /// Whether this entry is selected for persistence. Starts as `is_achieved`.
    pub checked: bool,
}

impl AchievementInfo {
    pub fn from_definition(definition: &AchievementDefinition, is_achieved: bool, unlock_epoch: i64) -> Self {
        let is_token = definition.name.starts_with(TOKEN_MARKER);
        let (name, description) = if is_token {
            (definition.id.clone(), String::new())
        } else {
            (definition.name.clone(), definition.description.clone())
        };

        let unlock_time_unix = (unlock_epoch > 0).then_some(unlock_epoch);
        let unlock_time_local = if is_achieved && unlock_epoch > 0 {
            Local.timestamp_opt(unlock_epoch, 0).single()
        } else {
            None
        };

        Self {
            id: definition.id.clone(),
            name,
            description,
            icon_unlocked: definition.icon_unlocked.clone(),
            icon_locked: definition.icon_locked.clone(),
            is_hidden: definition.is_hidden,
            permission: definition.permission,
            is_achieved,
            unlock_time_local,
            unlock_time_unix,
            image_index: None,
            checked: is_achieved,
        }
    }

    /// Icon cache key for the current unlock state.
    pub fn icon_key(&self) -> &str {
        if self.is_achieved || self.icon_locked.is_empty() {
            &self.icon_unlocked
        } else {
            &self.icon_locked
        }
    }

    pub fn is_protected(&self) -> bool {
        is_protected(self.permission)
    }
}

/// Errors raised when editing a stat value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatEditError {
    #[error("Stat '{0}' is protected and cannot be modified")]
    Protected(String),

    #[error("Stat '{id}' is increment-only: {attempted} is below {current}")]
    IncrementOnly {
        id: String,
        current: String,
        attempted: String,
    },

    #[error("Stat '{0}' does not accept a value of this type")]
    TypeMismatch(String),

    #[error("Invalid value for stat '{id}': {input}")]
    InvalidValue { id: String, input: String },

    #[error("Unknown stat '{0}'")]
    UnknownStat(String),
}

/// A stat value of either kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    Integer(i32),
    Float(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntStatInfo {
    pub id: String,
    pub display_name: String,
    pub value: i32,
    pub original_value: i32,
    pub increment_only: bool,
    pub permission: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatStatInfo {
    pub id: String,
    pub display_name: String,
    pub value: f32,
    pub original_value: f32,
    pub increment_only: bool,
    pub permission: i32,
}

/// Runtime view of one statistic.
#[derive(Debug, Clone, PartialEq)]
pub enum StatInfo {
    Integer(IntStatInfo),
    Float(FloatStatInfo),
}

impl StatInfo {
    pub fn id(&self) -> &str {
        match self {
            Self::Integer(info) => &info.id,
            Self::Float(info) => &info.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Integer(info) => &info.display_name,
            Self::Float(info) => &info.display_name,
        }
    }

    pub fn value(&self) -> StatValue {
        match self {
            Self::Integer(info) => StatValue::Integer(info.value),
            Self::Float(info) => StatValue::Float(info.value),
        }
    }

    pub fn original_value(&self) -> StatValue {
        match self {
            Self::Integer(info) => StatValue::Integer(info.original_value),
            Self::Float(info) => StatValue::Float(info.original_value),
        }
    }

    pub fn is_modified(&self) -> bool {
        match self {
            Self::Integer(info) => info.value != info.original_value,
            Self::Float(info) => info.value != info.original_value,
        }
    }

    pub fn is_protected(&self) -> bool {
        match self {
            Self::Integer(info) => is_protected(info.permission),
            Self::Float(info) => is_protected(info.permission),
        }
    }

    /// Parse user input into a value of this stat's kind.
    pub fn parse_value(&self, input: &str) -> Result<StatValue, StatEditError> {
        let invalid = || StatEditError::InvalidValue {
            id: self.id().to_string(),
            input: input.to_string(),
        };
        match self {
            Self::Integer(_) => input
                .trim()
                .parse::<i32>()
                .map(StatValue::Integer)
                .map_err(|_| invalid()),
            Self::Float(_) => match input.trim().parse::<f32>() {
                Ok(v) if v.is_finite() => Ok(StatValue::Float(v)),
                _ => Err(invalid()),
            },
        }
    }

    /// Apply an edit.
    ///
    /// Protected stats reject every write. Increment-only stats reject values
    /// below the value the live source reported.
    pub fn set_value(&mut self, value: StatValue) -> Result<(), StatEditError> {
        if self.is_protected() {
            return Err(StatEditError::Protected(self.id().to_string()));
        }

        match (self, value) {
            (Self::Integer(info), StatValue::Integer(new)) => {
                if info.increment_only && new < info.original_value {
                    return Err(StatEditError::IncrementOnly {
                        id: info.id.clone(),
                        current: info.original_value.to_string(),
                        attempted: new.to_string(),
                    });
                }
                info.value = new;
                Ok(())
            }
            (Self::Float(info), StatValue::Float(new)) => {
                if !new.is_finite() {
                    return Err(StatEditError::InvalidValue {
                        id: info.id.clone(),
                        input: new.to_string(),
                    });
                }
                if info.increment_only && new < info.original_value {
                    return Err(StatEditError::IncrementOnly {
                        id: info.id.clone(),
                        current: info.original_value.to_string(),
                        attempted: new.to_string(),
                    });
                }
                info.value = new;
                Ok(())
            }
            (other, _) => Err(StatEditError::TypeMismatch(other.id().to_string())),
        }
    }

    /// Drop any pending edit.
    pub fn revert(&mut self) {
        match self {
            Self::Integer(info) => info.value = info.original_value,
            Self::Float(info) => info.value = info.original_value,
        }
    }
}

/// Permission bits that mark a stat or achievement as protected from editing.
pub const PROTECTED_PERMISSION_MASK: i32 = 3;

/// Returns true if the permission bitmask forbids client-side edits.
pub fn is_protected(permission: i32) -> bool {
    permission & PROTECTED_PERMISSION_MASK != 0
}

/// Stat type tag as stored in the schema's `type_int` / `type` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Invalid = 0,
    Integer = 1,
    Float = 2,
    AverageRate = 3,
    Achievements = 4,
    GroupAchievements = 5,
}

impl StatKind {
    /// Map a raw schema tag. Unknown tags yield `None`.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Invalid),
            1 => Some(Self::Integer),
            2 => Some(Self::Float),
            3 => Some(Self::AverageRate),
            4 => Some(Self::Achievements),
            5 => Some(Self::GroupAchievements),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegerStatDefinition {
    pub id: String,
    pub display_name: String,
    pub min_value: i32,
    pub max_value: i32,
    pub max_change: i32,
    pub increment_only: bool,
    pub set_by_trusted_game_server: bool,
    pub default_value: i32,
    pub permission: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatStatDefinition {
    pub id: String,
    pub display_name: String,
    pub min_value: f32,
    pub max_value: f32,
    pub max_change: f32,
    pub increment_only: bool,
    pub default_value: f32,
    pub permission: i32,
}

/// Schema-derived description of one statistic.
#[derive(Debug, Clone, PartialEq)]
pub enum StatDefinition {
    Integer(IntegerStatDefinition),
    Float(FloatStatDefinition),
}

impl StatDefinition {
    pub fn id(&self) -> &str {
        match self {
            Self::Integer(def) => &def.id,
            Self::Float(def) => &def.id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Integer(def) => &def.display_name,
            Self::Float(def) => &def.display_name,
        }
    }

    pub fn permission(&self) -> i32 {
        match self {
            Self::Integer(def) => def.permission,
            Self::Float(def) => def.permission,
        }
    }

    pub fn increment_only(&self) -> bool {
        match self {
            Self::Integer(def) => def.increment_only,
            Self::Float(def) => def.increment_only,
        }
    }
}

/// Schema-derived description of one achievement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Icon shown once unlocked. Doubles as the icon cache key.
    pub icon_unlocked: String,
    /// Icon shown while locked. Equal to `icon_unlocked` when the schema has none.
    pub icon_locked: String,
    pub is_hidden: bool,
    pub permission: i32,
}

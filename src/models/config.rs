use serde::{Deserialize, Serialize};

/// Base directory for saved achievement files.
///
/// Fixed per deployment; each game gets `<base>/<game id>/achievements.ini`.
pub const DEFAULT_SAVE_BASE_PATH: &str = "steam_settings/saves";

/// Default CDN root for achievement icons.
pub const DEFAULT_ICON_CDN_BASE: &str =
    "https://cdn.steamstatic.com/steamcommunity/public/images/apps";

/// User configuration from statkeeper.yaml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(rename = "Settings", default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Client install directory holding `appcache/stats`.
    #[serde(rename = "Steam Install Path", default)]
    pub steam_install_path: String,

    #[serde(rename = "Language", default = "default_language")]
    pub language: String,

    #[serde(rename = "Icon CDN", default = "default_icon_cdn_base")]
    pub icon_cdn_base: String,

    #[serde(rename = "Log Directory", default = "default_log_dir")]
    pub log_dir: String,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            steam_install_path: String::new(),
            language: default_language(),
            icon_cdn_base: default_icon_cdn_base(),
            log_dir: default_log_dir(),
            debug_mode: false,
        }
    }
}

fn default_language() -> String {
    "english".to_string()
}

fn default_icon_cdn_base() -> String {
    DEFAULT_ICON_CDN_BASE.to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Settings {
    /// Whether a client install directory has been configured
    pub fn has_install_path(&self) -> bool {
        !self.steam_install_path.trim().is_empty()
    }
}

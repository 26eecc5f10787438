//! Settings file handling for the Daily Drip binary.

use shared::settings::AppSettings;
use std::path::{Path, PathBuf};

/// Get the config file path
pub fn config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("app", "DailyDrip", "daily-drip")
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Load settings from `path`. Missing or invalid files yield defaults; the
/// flag reports whether the file was used.
pub fn load_settings_from(path: &Path) -> (AppSettings, bool) {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return (AppSettings::default(), false);
    };
    match serde_json::from_str::<AppSettings>(&contents) {
        Ok(settings) => (settings, true),
        Err(err) => {
            tracing::warn!(path = %path.display(), "ignoring invalid settings: {}", err);
            (AppSettings::default(), false)
        }
    }
}

/// Load settings from disk or return defaults
pub fn load_settings_or_default() -> (AppSettings, bool) {
    match config_path() {
        Some(path) => load_settings_from(&path),
        None => (AppSettings::default(), false),
    }
}

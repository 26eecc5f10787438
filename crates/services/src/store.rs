//! Persisted desk state: one JSON file per key under the data directory.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::news::NewsArticle;
use shared::DripError;
use std::path::PathBuf;

pub const DARK_MODE_KEY: &str = "daily-drip-dark-mode";
pub const BREWED_KEY: &str = "daily-drip-brewed";
pub const LAST_BREW_KEY: &str = "daily-drip-last-brew";
pub const NEWS_KEY: &str = "daily-drip-news";
pub const STARRED_KEY: &str = "daily-drip-starred";

/// Everything the desk keeps across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub dark_mode: bool,
    pub brewed_today: bool,
    pub last_brew_date: String,
    pub news: Vec<NewsArticle>,
    pub starred: Vec<NewsArticle>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            dark_mode: true,
            brewed_today: false,
            last_brew_date: String::new(),
            news: Vec::new(),
            starred: Vec::new(),
        }
    }
}

pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store under the platform data directory, or `override_dir` when set.
    pub fn open_default(override_dir: Option<&str>) -> Result<Self, DripError> {
        if let Some(dir) = override_dir {
            return Ok(Self::new(dir));
        }
        let dirs = directories::ProjectDirs::from("app", "DailyDrip", "daily-drip")
            .ok_or_else(|| DripError::Storage("no home directory for local state".into()))?;
        Ok(Self::new(dirs.data_dir()))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Read one key. Missing or unreadable values yield `default`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let path = self.path_for(key);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => return default,
        };
        match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, "ignoring unreadable stored value: {}", err);
                default
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), DripError> {
        std::fs::create_dir_all(&self.dir).map_err(DripError::storage)?;
        let json = serde_json::to_string(value).map_err(DripError::storage)?;
        std::fs::write(self.path_for(key), json).map_err(DripError::storage)
    }

    pub fn load(&self) -> PersistedState {
        let defaults = PersistedState::default();
        PersistedState {
            dark_mode: self.get(DARK_MODE_KEY, defaults.dark_mode),
            brewed_today: self.get(BREWED_KEY, defaults.brewed_today),
            last_brew_date: self.get(LAST_BREW_KEY, defaults.last_brew_date),
            news: self.get(NEWS_KEY, defaults.news),
            starred: self.get(STARRED_KEY, defaults.starred),
        }
    }

    pub fn save(&self, state: &PersistedState) -> Result<(), DripError> {
        self.set(DARK_MODE_KEY, &state.dark_mode)?;
        self.set(BREWED_KEY, &state.brewed_today)?;
        self.set(LAST_BREW_KEY, &state.last_brew_date)?;
        self.set(NEWS_KEY, &state.news)?;
        self.set(STARRED_KEY, &state.starred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(headline: &str) -> NewsArticle {
        NewsArticle {
            headline: headline.into(),
            summary: "Summary.".into(),
            source: "https://example.com".into(),
            tags: vec!["☕".into()],
            is_starred: false,
        }
    }

    #[test]
    fn test_empty_dir_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());
        let state = store.load();
        assert!(state.dark_mode);
        assert!(!state.brewed_today);
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path().join("nested"));
        let state = PersistedState {
            dark_mode: false,
            brewed_today: true,
            last_brew_date: "10/16/2026".into(),
            news: vec![article("One"), article("Two")],
            starred: vec![article("One")],
        };
        store.save(&state).unwrap();
        assert_eq!(store.load(), state);
    }

    #[test]
    fn test_values_use_one_file_per_key() {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalStore::new(tmp.path());
        store.set(NEWS_KEY, &vec![article("One")]).unwrap();
        let raw = std::fs::read_to_string(tmp.path().join("daily-drip-news.json")).unwrap();
        assert!(raw.contains("\"isStarred\":false"));
    }

    #[test]
    fn test_corrupt_value_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("daily-drip-dark-mode.json"), "not json").unwrap();
        let store = LocalStore::new(tmp.path());
        assert!(store.load().dark_mode);
    }
}

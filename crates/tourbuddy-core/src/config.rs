//! Application configuration management.
//!
//! Holds the Firebase project settings, the SerpAPI key and the last used
//! email. Configuration is stored at `~/.config/tourbuddy/config.json`;
//! `TOURBUDDY_*` environment variables override individual fields.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "tourbuddy";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Firebase project id, e.g. `tourbuddy-3890b`
    pub project_id: Option<String>,
    /// Firebase web API key
    pub api_key: Option<String>,
    pub serpapi_key: Option<String>,
    pub last_email: Option<String>,
    /// `host:port` of a local Firestore emulator, for development
    #[serde(default)]
    pub firestore_emulator_host: Option<String>,
    #[serde(default)]
    pub log_to_file: bool,
}

impl Config {
    /// Load from disk and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config: Config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override fields from `TOURBUDDY_*` variables (and the standard
    /// `FIRESTORE_EMULATOR_HOST`) as returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |slot: &mut Option<String>, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value);
            }
        };
        set(&mut self.project_id, "TOURBUDDY_PROJECT_ID");
        set(&mut self.api_key, "TOURBUDDY_API_KEY");
        set(&mut self.serpapi_key, "TOURBUDDY_SERPAPI_KEY");
        set(&mut self.last_email, "TOURBUDDY_EMAIL");
        set(&mut self.firestore_emulator_host, "FIRESTORE_EMULATOR_HOST");
    }

    pub fn project_id(&self) -> Result<&str> {
        self.project_id
            .as_deref()
            .ok_or_else(|| anyhow!("No Firebase project configured (set TOURBUDDY_PROJECT_ID)"))
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("No Firebase API key configured (set TOURBUDDY_API_KEY)"))
    }

    pub fn serpapi_key(&self) -> Result<&str> {
        self.serpapi_key
            .as_deref()
            .ok_or_else(|| anyhow!("No SerpAPI key configured (set TOURBUDDY_SERPAPI_KEY)"))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Root cache directory. Holds the session file, log files and one
    /// snapshot directory per user.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

//! Configuration system
//!
//! Handles loading configuration from multiple sources:
//! - Global config (~/.config/invitebot/config.toml)
//! - Project config (./invitebot.toml)
//! - Environment variables (INVITEBOT_*)
//!
//! The bot token is never read from a config file; it comes only from the
//! `INVITEBOT_TOKEN` environment variable or the `--token` flag.

use crate::badges::{Tier, TierError, TierTable};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Environment variable holding the chat platform secret
pub const TOKEN_ENV: &str = "INVITEBOT_TOKEN";

/// Project-local config file name
const PROJECT_CONFIG: &str = "invitebot.toml";

/// Startup configuration failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no bot token configured; set INVITEBOT_TOKEN or pass --token")]
    MissingToken,

    #[error("invalid tier table: {0}")]
    Tiers(#[from] TierError),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chat-side settings
    #[serde(default)]
    pub bot: BotConfig,

    /// Where the JSON documents live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Prize ladder; the stock 5/15/50 ladder when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiers: Option<Vec<Tier>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot username used to build referral links; discovered via the API when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Rows shown by the leaderboard command
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,

    /// Long-poll timeout passed to the platform
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Bot API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: None,
            leaderboard_size: default_leaderboard_size(),
            poll_timeout_secs: default_poll_timeout_secs(),
            api_base: default_api_base(),
        }
    }
}

fn default_leaderboard_size() -> usize {
    5
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Directory holding referrals.json, display_names.json and badges.json
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources (global, project, env)
    pub async fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            let content = fs::read_to_string(&global_path).await?;
            let global: Config = toml::from_str(&content)?;
            config = config.merge(global);
        }

        // Load project config
        let path = PathBuf::from(PROJECT_CONFIG);
        if path.exists() {
            let content = fs::read_to_string(&path).await?;
            let project: Config = toml::from_str(&content)?;
            config = config.merge(project);
        }

        // Apply environment overrides
        config.apply_env();

        Ok(config)
    }

    /// Get the global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "invitebot", "invitebot")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Directory for the JSON documents: configured, else the platform data dir, else `.`
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.storage.data_dir {
            return dir.clone();
        }
        ProjectDirs::from("org", "invitebot", "invitebot")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Validated prize ladder
    pub fn tier_table(&self) -> Result<TierTable, ConfigError> {
        match &self.tiers {
            Some(tiers) => Ok(TierTable::new(tiers.clone())?),
            None => Ok(TierTable::default()),
        }
    }

    /// Initialize default configuration file
    pub async fn init_default() -> Result<()> {
        if let Some(path) = Self::global_config_path() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let default = Self {
                tiers: Some(crate::badges::default_tiers()),
                ..Self::default()
            };
            let content = toml::to_string_pretty(&default)?;
            fs::write(&path, content).await?;
            tracing::info!("Created config at {:?}", path);
        }
        Ok(())
    }

    /// Set a configuration value in the global config file
    pub async fn set(key: &str, value: &str) -> Result<()> {
        match Self::global_config_path() {
            Some(path) => Self::set_in_file(&path, key, value).await,
            None => anyhow::bail!("No config directory available on this platform"),
        }
    }

    /// Update one key in the file at `path`, leaving every other layer out.
    pub async fn set_in_file(path: &Path, key: &str, value: &str) -> Result<()> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).await?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply(key, value)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(&config)?;
        fs::write(path, content).await?;
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "bot.username" => self.bot.username = Some(value.trim_start_matches('@').to_string()),
            "bot.leaderboard_size" => self.bot.leaderboard_size = parse_number(key, value)?,
            "bot.poll_timeout_secs" => self.bot.poll_timeout_secs = parse_number(key, value)?,
            "bot.api_base" => self.bot.api_base = value.trim_end_matches('/').to_string(),
            "storage.data_dir" => self.storage.data_dir = Some(PathBuf::from(value)),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Merge two configs (other takes precedence)
    fn merge(mut self, other: Self) -> Self {
        if other.bot.username.is_some() {
            self.bot.username = other.bot.username;
        }
        if other.bot.leaderboard_size != default_leaderboard_size() {
            self.bot.leaderboard_size = other.bot.leaderboard_size;
        }
        if other.bot.poll_timeout_secs != default_poll_timeout_secs() {
            self.bot.poll_timeout_secs = other.bot.poll_timeout_secs;
        }
        if other.bot.api_base != default_api_base() {
            self.bot.api_base = other.bot.api_base;
        }
        if other.storage.data_dir.is_some() {
            self.storage.data_dir = other.storage.data_dir;
        }
        if other.tiers.is_some() {
            self.tiers = other.tiers;
        }
        self
    }

    /// Apply environment variable overrides
    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("INVITEBOT_DATA_DIR") {
            self.storage.data_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("INVITEBOT_USERNAME") {
            self.bot.username = Some(val.trim_start_matches('@').to_string());
        }
        if let Ok(val) = std::env::var("INVITEBOT_API_BASE") {
            self.bot.api_base = val.trim_end_matches('/').to_string();
        }
        if let Ok(val) = std::env::var("INVITEBOT_LEADERBOARD_SIZE") {
            match parse_number::<usize>("INVITEBOT_LEADERBOARD_SIZE", &val) {
                Ok(size) => self.bot.leaderboard_size = size,
                Err(_) => tracing::warn!(
                    value = %val,
                    "Invalid INVITEBOT_LEADERBOARD_SIZE value; expected a number"
                ),
            }
        }
    }
}

/// The bot token, or [`ConfigError::MissingToken`] when absent or blank
pub fn require_token(token: Option<&str>) -> Result<String, ConfigError> {
    match token.map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(ConfigError::MissingToken),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_touches_only_the_target_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bot]\nusername = \"kept_bot\"\n").unwrap();

        Config::set_in_file(&path, "bot.leaderboard_size", "8").await.unwrap();

        let written: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.bot.username.as_deref(), Some("kept_bot"));
        assert_eq!(written.bot.leaderboard_size, 8);
        assert_eq!(written.storage.data_dir, None);
        assert!(written.tiers.is_none());
    }

    #[tokio::test]
    async fn test_set_creates_missing_file_and_rejects_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(Config::set_in_file(&path, "bot.colour", "red").await.is_err());
        assert!(!path.exists());

        Config::set_in_file(&path, "storage.data_dir", "/srv/invitebot").await.unwrap();
        let written: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.storage.data_dir, Some(PathBuf::from("/srv/invitebot")));
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bot.leaderboard_size, 5);
        assert_eq!(config.bot.api_base, "https://api.telegram.org");
        assert_eq!(config.tier_table().unwrap(), TierTable::default());
    }

    #[test]
    fn test_parse_tiers_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [bot]
            username = "giveaway_bot"

            [[tiers]]
            threshold = 3
            badge = "starter"
            reward = "Sticker"

            [[tiers]]
            threshold = 10
            badge = "pro"
            "#,
        )
        .unwrap();

        let table = config.tier_table().unwrap();
        assert_eq!(table.tiers().len(), 2);
        assert_eq!(table.tiers()[1].reward, "");
        assert_eq!(config.bot.leaderboard_size, 5);
    }

    #[test]
    fn test_invalid_tiers_surface_as_config_error() {
        let config = Config {
            tiers: Some(vec![Tier::new(10, "a", ""), Tier::new(3, "b", "")]),
            ..Config::default()
        };
        assert!(matches!(config.tier_table(), Err(ConfigError::Tiers(_))));
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = Config {
            tiers: Some(vec![Tier::new(1, "one", "")]),
            ..Config::default()
        };
        let mut other = Config::default();
        other.bot.leaderboard_size = 10;
        other.storage.data_dir = Some(PathBuf::from("/var/lib/invitebot"));

        let merged = base.merge(other);
        assert_eq!(merged.bot.leaderboard_size, 10);
        assert_eq!(merged.data_dir(), PathBuf::from("/var/lib/invitebot"));
        // Unset tiers in the overriding file keep the earlier ladder
        assert_eq!(merged.tiers.unwrap().len(), 1);
    }

    #[test]
    fn test_apply_known_and_unknown_keys() {
        let mut config = Config::default();
        config.apply("bot.username", "@my_bot").unwrap();
        config.apply("bot.leaderboard_size", "8").unwrap();
        assert_eq!(config.bot.username.as_deref(), Some("my_bot"));
        assert_eq!(config.bot.leaderboard_size, 8);

        assert!(config.apply("bot.leaderboard_size", "many").is_err());
        assert!(config.apply("nope", "1").is_err());
    }

    #[test]
    fn test_require_token() {
        assert!(matches!(require_token(None), Err(ConfigError::MissingToken)));
        assert!(matches!(require_token(Some("  ")), Err(ConfigError::MissingToken)));
        assert_eq!(require_token(Some(" 123:abc ")).unwrap(), "123:abc");
    }
}

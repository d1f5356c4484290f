//! Application configuration
//!
//! Defaults, then an optional `landosol.toml`, then `LANDOSOL_*` environment
//! variables (nested keys use `__`, e.g. `LANDOSOL_GUESS__AVATAR_TURN_SECS`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::services::GuessSettings;

const CONFIG_FILE: &str = "landosol";
const ENV_PREFIX: &str = "LANDOSOL";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server port
    pub server_port: u16,
    /// SQLite database for win records and group pool choices
    pub database_url: String,
    /// Local JSON cache (names, profiles, pools, artwork)
    pub data_dir: PathBuf,
    /// Static resources (fortune data)
    pub resources_dir: PathBuf,

    pub pool_url: String,
    pub pool_version_url: String,
    /// Base URL of the character artwork mirror
    pub image_base_url: String,
    pub http_timeout_secs: u64,

    /// Pool used by groups that have not chosen one
    pub default_pool: String,
    /// Stand-in name for empty pool rosters
    pub filler_character: String,

    /// Refresh pools once a day at `auto_update_hour:auto_update_minute`
    /// in the fortune timezone
    pub auto_update: bool,
    pub auto_update_hour: u32,
    pub auto_update_minute: u32,

    pub guess: GuessConfig,
    pub fortune: FortuneConfig,
    pub sign: SignConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_url: "sqlite://data/landosol.db?mode=rwc".to_string(),
            data_dir: PathBuf::from("data"),
            resources_dir: PathBuf::from("resources"),
            pool_url: "https://api.redive.lolikon.icu/gacha/default_gacha.json".to_string(),
            pool_version_url: "https://api.redive.lolikon.icu/gacha/gacha_ver.json".to_string(),
            image_base_url: "https://redive.estertion.win".to_string(),
            http_timeout_secs: 15,
            default_pool: "BL".to_string(),
            filler_character: "镜华(万圣节)".to_string(),
            auto_update: true,
            auto_update_hour: 17,
            auto_update_minute: 5,
            guess: GuessConfig::default(),
            fortune: FortuneConfig::default(),
            sign: SignConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuessConfig {
    pub avatar_patch_size: u32,
    pub avatar_turn_secs: u64,
    pub avatar_blacklist: Vec<u32>,
    pub card_patch_size: u32,
    pub card_turn_secs: u64,
    pub card_blacklist: Vec<u32>,
    pub desc_prepare_secs: u64,
    pub desc_turn_secs: u64,
    pub desc_turn_number: usize,
    pub match_threshold: u8,
}

impl Default for GuessConfig {
    fn default() -> Self {
        let defaults = GuessSettings::default();
        let numeric = |ids: &[String]| ids.iter().filter_map(|id| id.parse().ok()).collect();
        Self {
            avatar_patch_size: defaults.avatar_patch_size,
            avatar_turn_secs: defaults.avatar_turn.as_secs(),
            avatar_blacklist: numeric(&defaults.avatar_blacklist),
            card_patch_size: defaults.card_patch_size,
            card_turn_secs: defaults.card_turn.as_secs(),
            card_blacklist: numeric(&defaults.card_blacklist),
            desc_prepare_secs: defaults.desc_prepare.as_secs(),
            desc_turn_secs: defaults.desc_turn.as_secs(),
            desc_turn_number: defaults.desc_turn_number,
            match_threshold: defaults.match_threshold,
        }
    }
}

impl GuessConfig {
    pub fn to_settings(&self) -> GuessSettings {
        let ids = |ids: &[u32]| ids.iter().map(u32::to_string).collect();
        GuessSettings {
            avatar_patch_size: self.avatar_patch_size,
            avatar_turn: Duration::from_secs(self.avatar_turn_secs),
            avatar_blacklist: ids(&self.avatar_blacklist),
            card_patch_size: self.card_patch_size,
            card_turn: Duration::from_secs(self.card_turn_secs),
            card_blacklist: ids(&self.card_blacklist),
            desc_prepare: Duration::from_secs(self.desc_prepare_secs),
            desc_turn: Duration::from_secs(self.desc_turn_secs),
            desc_turn_number: self.desc_turn_number,
            match_threshold: self.match_threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FortuneConfig {
    /// Slips per user per day
    pub daily_limit: u32,
    pub utc_offset_hours: i32,
}

impl Default for FortuneConfig {
    fn default() -> Self {
        Self {
            daily_limit: 5,
            utc_offset_hours: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignConfig {
    /// Timezone whose midnight starts a new sign-in day
    pub utc_offset_hours: i32,
}

impl Default for SignConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 8,
        }
    }
}

impl AppConfig {
    /// Load configuration from `landosol.toml` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load with an explicit config file path; a missing file is not an error
    pub fn load_from(file: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("guess.avatar_blacklist")
                    .with_list_parse_key("guess.card_blacklist"),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.auto_update_hour > 23 || config.auto_update_minute > 59 {
            anyhow::bail!(
                "auto_update time {}:{} is not a valid time of day",
                config.auto_update_hour,
                config.auto_update_minute
            );
        }
        Ok(config)
    }

    pub fn image_cache_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn fortune_dir(&self) -> PathBuf {
        self.resources_dir.join("portune")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_pool, "BL");
        assert_eq!(config.guess.avatar_patch_size, 32);
        assert_eq!(config.guess.card_blacklist.len(), 21);
        assert_eq!(config.fortune.daily_limit, 5);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landosol.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "server_port = 8080\ndefault_pool = \"JP\"\n\n[guess]\navatar_turn_secs = 30\navatar_blacklist = [1001]\n"
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.default_pool, "JP");

        let settings = config.guess.to_settings();
        assert_eq!(settings.avatar_turn, Duration::from_secs(30));
        assert_eq!(settings.avatar_blacklist, vec!["1001".to_string()]);
        // untouched keys keep their defaults
        assert_eq!(settings.card_patch_size, 180);
    }

    #[test]
    fn test_invalid_update_time_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landosol.toml");
        std::fs::write(&path, "auto_update_hour = 25\n").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
    }
}

//! Bot configuration loaded from TOML.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// How the fleet walks the account list.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// One account at a time, in file order.
    Sequential,
    /// One worker per account, all at once.
    Concurrent,
    /// First account only, reconnecting forever.
    Single,
}

/// Configuration for the bot.
#[derive(Debug, Clone, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct BotConfig {
    /// Game service base URL (HTTP login and socket host).
    #[serde(default = "default_base_url")]
    base_url: String,

    /// `Origin` header sent on login and socket upgrade.
    #[serde(default = "default_origin")]
    origin: String,

    /// `Referer` header sent on login.
    #[serde(default = "default_referer")]
    referer: String,

    /// `User-Agent` for the login request.
    #[serde(default = "default_login_user_agent")]
    login_user_agent: String,

    /// `User-Agent` for the socket upgrade.
    #[serde(default = "default_socket_user_agent")]
    socket_user_agent: String,

    /// Account file, one query credential per line.
    #[serde(default = "default_data_file")]
    #[setters(into)]
    data_file: PathBuf,

    /// Game counter value at which a session stops starting games.
    #[serde(default = "default_max_games")]
    max_games: u32,

    /// Login request timeout in seconds.
    #[serde(default = "default_login_timeout_secs")]
    login_timeout_secs: u64,

    /// Socket open timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    connect_timeout_secs: u64,

    /// Wait before reconnecting after a disconnect.
    #[serde(default = "default_reconnect_cooldown_secs")]
    reconnect_cooldown_secs: u64,

    /// Wait between accounts in sequential mode.
    #[serde(default = "default_account_pause_secs")]
    account_pause_secs: u64,

    /// Wait after a full pass over the account list.
    #[serde(default = "default_cycle_pause_secs")]
    cycle_pause_secs: u64,

    /// Fleet mode.
    #[serde(default = "default_mode")]
    mode: Mode,
}

fn default_base_url() -> String {
    "https://tongame-service-roy7ocqnoq-ew.a.run.app".to_string()
}

fn default_origin() -> String {
    "https://netcoin.layernet.ai".to_string()
}

fn default_referer() -> String {
    "https://netcoin.layernet.ai/".to_string()
}

fn default_login_user_agent() -> String {
    "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36".to_string()
}

fn default_socket_user_agent() -> String {
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1".to_string()
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data.txt")
}

fn default_max_games() -> u32 {
    5
}

fn default_login_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_reconnect_cooldown_secs() -> u64 {
    3
}

fn default_account_pause_secs() -> u64 {
    3
}

fn default_cycle_pause_secs() -> u64 {
    30
}

fn default_mode() -> Mode {
    Mode::Sequential
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            origin: default_origin(),
            referer: default_referer(),
            login_user_agent: default_login_user_agent(),
            socket_user_agent: default_socket_user_agent(),
            data_file: default_data_file(),
            max_games: default_max_games(),
            login_timeout_secs: default_login_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_cooldown_secs: default_reconnect_cooldown_secs(),
            account_pause_secs: default_account_pause_secs(),
            cycle_pause_secs: default_cycle_pause_secs(),
            mode: default_mode(),
        }
    }
}

impl BotConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(base_url = %config.base_url, mode = %config.mode, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Login request timeout.
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    /// Socket open timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Wait before reconnecting.
    pub fn reconnect_cooldown(&self) -> Duration {
        Duration::from_secs(self.reconnect_cooldown_secs)
    }

    /// Wait between accounts.
    pub fn account_pause(&self) -> Duration {
        Duration::from_secs(self.account_pause_secs)
    }

    /// Wait between passes over the account list.
    pub fn cycle_pause(&self) -> Duration {
        Duration::from_secs(self.cycle_pause_secs)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

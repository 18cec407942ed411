//! Configuration loading for hivekit.
//!
//! A flat TOML file, overlaid by `HIVEKIT_`-prefixed environment
//! variables, translated into `hivekit_core::HiveConfig`. The CLI layers
//! its own flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use hivekit_core::HiveConfig;
use hivekit_core::config::{DEFAULT_COMMAND_REFRESH_DELAY, DEFAULT_DEBOUNCE, DEFAULT_LOGIN_URL};

/// Prefix for environment overrides, e.g. `HIVEKIT_USERNAME`.
pub const ENV_PREFIX: &str = "HIVEKIT_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {field} configured")]
    MissingCredential { field: &'static str },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// On-disk configuration. Durations are whole seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Plaintext in the file; prefer `HIVEKIT_PASSWORD`.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Poll interval. Unset or below one second means the 60 s default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,

    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Fixed API base, instead of the one discovered at login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Per-request timeout. Unset means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default = "default_command_refresh_delay")]
    pub command_refresh_delay: u64,

    #[serde(default = "default_debounce")]
    pub debounce: u64,

    /// Skip TLS certificate verification.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            poll_interval: None,
            login_url: default_login_url(),
            api_base: None,
            timeout: None,
            command_refresh_delay: default_command_refresh_delay(),
            debounce: default_debounce(),
            accept_invalid_certs: default_accept_invalid_certs(),
        }
    }
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.into()
}
fn default_command_refresh_delay() -> u64 {
    DEFAULT_COMMAND_REFRESH_DELAY.as_secs()
}
fn default_debounce() -> u64 {
    DEFAULT_DEBOUNCE.as_secs()
}
fn default_accept_invalid_certs() -> bool {
    true
}

impl Config {
    /// Build the runtime config. Username and password must both be set.
    pub fn to_hive_config(&self) -> Result<HiveConfig, ConfigError> {
        let username = self
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingCredential { field: "username" })?;
        let password = self
            .password
            .clone()
            .map(SecretString::from)
            .ok_or(ConfigError::MissingCredential { field: "password" })?;

        let login_url = parse_url("login_url", &self.login_url)?;
        let api_base = self
            .api_base
            .as_deref()
            .map(|base| parse_url("api_base", base))
            .transpose()?;

        Ok(HiveConfig {
            username,
            password,
            poll_interval: self.poll_interval.map(Duration::from_secs),
            login_url,
            api_base,
            timeout: self.timeout.map(Duration::from_secs),
            command_refresh_delay: Duration::from_secs(self.command_refresh_delay),
            debounce: Duration::from_secs(self.debounce),
            accept_invalid_certs: self.accept_invalid_certs,
        })
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    value.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("{e}: {value}"),
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "hivekit", "hivekit").map_or_else(
        || PathBuf::from(".hivekit.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the default path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` plus environment. A missing file is not an
/// error; defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()?;
    Ok(config)
}

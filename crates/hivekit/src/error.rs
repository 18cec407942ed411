//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use hivekit_config::ConfigError;
use hivekit_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Hive API at {url}")]
    #[diagnostic(
        code(hivekit::connection_failed),
        help("Check your network connection. Cause: {reason}")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(hivekit::timeout),
        help("Increase the limit with --timeout, or retry later.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(hivekit::auth_failed),
        help("Verify your Hive username and password. Server said: {message}")
    )]
    AuthFailed { message: String },

    #[error("No {field} configured")]
    #[diagnostic(
        code(hivekit::no_credentials),
        help(
            "Pass --{field}, set HIVEKIT_USER / HIVEKIT_PASS,\n\
             or add `{field} = \"...\"` to {path}"
        )
    )]
    NoCredentials { field: &'static str, path: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Hive API error: {message}")]
    #[diagnostic(code(hivekit::api_error))]
    Api {
        message: String,
        status: Option<u16>,
    },

    #[error("No heating state available")]
    #[diagnostic(
        code(hivekit::no_state),
        help("The first poll after login failed. Rerun with -vv for details.")
    )]
    NoState,

    // ── Validation / configuration ───────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hivekit::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(hivekit::config))]
    Config { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    #[diagnostic(code(hivekit::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Api {
                status: Some(404), ..
            } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout => Self::Timeout,
            CoreError::Api { message, status } => Self::Api { message, status },
            CoreError::Decode { message } => Self::Api {
                message,
                status: None,
            },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Internal(message) => Self::Api {
                message,
                status: None,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::MissingCredential { field } => Self::NoCredentials {
                field,
                path: hivekit_config::config_path().display().to_string(),
            },
            ConfigError::Figment(e) => Self::Config {
                message: e.to_string(),
            },
        }
    }
}

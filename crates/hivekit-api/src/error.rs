// Error types for the Hive API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a login attempt failed.
///
/// Each variant is a distinct, reportable reason; none of them leaves a
/// half-initialised session behind.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The login request never got a response (DNS, refused, TLS, ...).
    #[error("login request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with something other than 200. `reason` is
    /// empty when the body carried none.
    #[error("incorrect status code {status}{}", reason_suffix(.reason))]
    Rejected { status: StatusCode, reason: String },

    /// 200, but the body was not the expected JSON.
    #[error("unreadable login response: {0}")]
    Decode(#[source] serde_json::Error),

    /// 200, but no session token in the body.
    #[error("invalid session token returned")]
    EmptyToken,
}

fn reason_suffix(reason: &str) -> String {
    if reason.is_empty() {
        String::new()
    } else {
        format!(": {reason}")
    }
}

/// Top-level error type for the `hivekit-api` crate.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login (initial or re-login after a 401) failed.
    #[error("Unable to login: {0}")]
    Authentication(#[from] AuthError),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to build the HTTP client.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Upstream ────────────────────────────────────────────────────
    /// Non-success status from an authenticated call. A 401 only lands
    /// here if it survived the re-login retry.
    #[error("Upstream API error (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Request body could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` if the failure is an authentication problem.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_)
                | Self::Upstream {
                    status: 401 | 403,
                    ..
                }
        )
    }

    /// Returns `true` if this is a transient error worth retrying later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Authentication(AuthError::Transport(e)) => e.is_timeout() || e.is_connect(),
            Self::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the upstream reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Upstream { status: 404, .. })
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            Self::Authentication(AuthError::Rejected { status, .. }) => Some(status.as_u16()),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

// Session login
//
// Form-encoded username/password login against the Hive login endpoint.
// A successful login yields a token plus the per-account API host, which
// the server advertises in the `x-governess-endpoint` response header.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AuthError, Error};

/// Production login endpoint.
pub const DEFAULT_LOGIN_URL: &str = "https://api.hivehome.com/v5/login";

/// API host used when the login response does not name one.
pub const DEFAULT_API_HOST: &str = "api-prod.bgchprod.info";

/// Response header carrying the account's API `host:port`.
pub const ENDPOINT_HEADER: &str = "x-governess-endpoint";

// ── Credentials ─────────────────────────────────────────────────────

/// Username/password pair used for every (re-)login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

// ── Session ─────────────────────────────────────────────────────────

/// An authenticated session: token plus the API base it is valid against.
///
/// Only ever built whole. A login either produces a complete `Session` or
/// an error, so token and base URL can never disagree.
#[derive(Debug, Clone)]
pub struct Session {
    token: SecretString,
    base_url: Url,
    authenticated_at: DateTime<Utc>,
    generation: u64,
}

impl Session {
    /// Build a session from an already-known token, e.g. one restored
    /// from elsewhere. It sorts before any session produced by a login.
    pub fn new(token: impl Into<String>, base_url: Url) -> Self {
        Self {
            token: SecretString::from(token.into()),
            base_url,
            authenticated_at: Utc::now(),
            generation: 0,
        }
    }

    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }

    /// Whether this session came from a later login than `other`.
    pub fn is_newer_than(&self, other: &Session) -> bool {
        self.generation > other.generation
    }

    /// Build `{base}/{path}`, keeping any path prefix on the base.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

// ── Login ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct LoginReply {
    #[serde(default, rename = "ApiSession", alias = "apiSession")]
    token: Option<String>,
    #[serde(default, alias = "Error")]
    error: Option<ErrorReply>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorReply {
    #[serde(default, alias = "Reason")]
    reason: Option<String>,
}

/// Performs logins. Holds the credentials; never holds a token.
pub struct SessionManager {
    http: reqwest::Client,
    login_url: Url,
    api_base: Option<Url>,
    credentials: Credentials,
    generation: AtomicU64,
}

impl SessionManager {
    pub fn new(http: reqwest::Client, login_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            login_url,
            api_base: None,
            credentials,
            generation: AtomicU64::new(1),
        }
    }

    /// Use a fixed API base instead of the one advertised at login.
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.api_base = Some(api_base);
        self
    }

    /// Log in and return a fresh session.
    ///
    /// Success needs HTTP 200 and a non-empty token. A non-200 reply is
    /// reported with its status and any server-supplied reason, even when
    /// the body does not parse.
    pub async fn login(&self) -> Result<Session, AuthError> {
        debug!(url = %self.login_url, username = %self.credentials.username, "logging in");

        let resp = self
            .http
            .post(self.login_url.clone())
            .form(&[
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.expose_secret()),
            ])
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = resp.status();
        let endpoint = resp
            .headers()
            .get(ENDPOINT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.bytes().await.map_err(AuthError::Transport)?;
        let reply = serde_json::from_slice::<LoginReply>(&body);

        if status != StatusCode::OK {
            let reason = reply
                .ok()
                .and_then(|r| r.error)
                .and_then(|e| e.reason)
                .unwrap_or_default();
            return Err(AuthError::Rejected { status, reason });
        }

        let reply = reply.map_err(AuthError::Decode)?;
        let token = reply
            .token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::EmptyToken)?;

        let base_url = match &self.api_base {
            Some(base) => base.clone(),
            None => base_url_from_endpoint(endpoint.as_deref()),
        };

        debug!(base = %base_url, "login successful");
        Ok(Session {
            token: SecretString::from(token),
            base_url,
            authenticated_at: Utc::now(),
            generation: self.generation.fetch_add(1, Ordering::Relaxed),
        })
    }
}

/// Turn an `x-governess-endpoint` value (`host:port`) into `https://host`.
pub fn base_url_from_endpoint(header: Option<&str>) -> Url {
    let host = header
        .and_then(|h| h.split(':').next())
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_API_HOST);

    Url::parse(&format!("https://{host}")).unwrap_or_else(|e| {
        warn!(host, error = %e, "unusable endpoint header, using default API host");
        default_api_base()
    })
}

fn default_api_base() -> Url {
    Url::parse(&format!("https://{DEFAULT_API_HOST}")).expect("default API host is a valid URL")
}

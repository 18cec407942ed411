// ── Runtime connection configuration ──
//
// Describes how to reach and poll the Hive API. Carries credentials and
// timing knobs but never touches disk; the CLI (via hivekit-config) builds
// a `HiveConfig` and hands it in.

use std::time::Duration;

use hivekit_api::transport::{TlsMode, TransportConfig};
use secrecy::SecretString;
use url::Url;

pub use hivekit_api::session::DEFAULT_LOGIN_URL;

/// Poll interval used when none is configured or the configured one is too short.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest poll interval honoured.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long after a command its follow-up refresh runs. The device needs
/// time to apply and report the change.
pub const DEFAULT_COMMAND_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Minimum spacing between timer-driven refreshes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(10);

/// Configuration for a single Hive account.
#[derive(Debug, Clone)]
pub struct HiveConfig {
    pub username: String,
    pub password: SecretString,
    /// Requested poll interval. See [`HiveConfig::effective_poll_interval`].
    pub poll_interval: Option<Duration>,
    /// Login endpoint.
    pub login_url: Url,
    /// Fixed API base, overriding the endpoint advertised at login.
    pub api_base: Option<Url>,
    /// Per-request timeout. `None` means no timeout.
    pub timeout: Option<Duration>,
    /// Delay between a successful command and its follow-up refresh.
    pub command_refresh_delay: Duration,
    /// Timer ticks closer than this to the last successful refresh are skipped.
    pub debounce: Duration,
    /// Skip certificate verification. On by default: the Omnia node
    /// endpoints have served certificates that fail validation.
    pub accept_invalid_certs: bool,
}

impl HiveConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            ..Self::default()
        }
    }

    /// The interval the poll loop actually uses: the configured one, or the
    /// default when unset or below [`MIN_POLL_INTERVAL`].
    pub fn effective_poll_interval(&self) -> Duration {
        match self.poll_interval {
            Some(interval) if interval >= MIN_POLL_INTERVAL => interval,
            _ => DEFAULT_POLL_INTERVAL,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: if self.accept_invalid_certs {
                TlsMode::DangerAcceptInvalid
            } else {
                TlsMode::System
            },
            timeout: self.timeout,
        }
    }
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: SecretString::from(String::new()),
            poll_interval: None,
            login_url: DEFAULT_LOGIN_URL
                .parse()
                .expect("default login URL is valid"),
            api_base: None,
            timeout: None,
            command_refresh_delay: DEFAULT_COMMAND_REFRESH_DELAY,
            debounce: DEFAULT_DEBOUNCE,
            accept_invalid_certs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_poll_interval_uses_default() {
        let config = HiveConfig::new("u", "p");
        assert_eq!(config.effective_poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn too_short_poll_interval_uses_default() {
        let mut config = HiveConfig::new("u", "p");
        config.poll_interval = Some(Duration::from_millis(10));
        assert_eq!(config.effective_poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn configured_poll_interval_is_kept() {
        let mut config = HiveConfig::new("u", "p");
        config.poll_interval = Some(Duration::from_secs(30));
        assert_eq!(config.effective_poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_certs_are_accepted_by_default() {
        let config = HiveConfig::new("u", "p");
        assert_eq!(config.transport().tls, TlsMode::DangerAcceptInvalid);
    }

    #[test]
    fn verification_can_be_turned_back_on() {
        let mut config = HiveConfig::new("u", "p");
        config.accept_invalid_certs = false;
        config.timeout = Some(Duration::from_secs(15));
        let transport = config.transport();
        assert_eq!(transport.tls, TlsMode::System);
        assert_eq!(transport.timeout, Some(Duration::from_secs(15)));
    }
}

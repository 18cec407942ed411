//! CLI-side config resolution: the file/env config from `hivekit-config`
//! with command-line flags layered on top.

use hivekit_config::{Config, load_config, load_config_from};
use hivekit_core::HiveConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build a `HiveConfig` from the config file, environment and flags.
///
/// Flags (and their `HIVEKIT_USER` / `HIVEKIT_PASS` fallbacks) win over
/// the file and `HIVEKIT_`-prefixed settings.
pub fn resolve(global: &GlobalOpts) -> Result<HiveConfig, CliError> {
    let cfg = match global.config.as_deref() {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(apply_overrides(cfg, global).to_hive_config()?)
}

fn apply_overrides(mut cfg: Config, global: &GlobalOpts) -> Config {
    if let Some(username) = &global.username {
        cfg.username = Some(username.clone());
    }
    if let Some(password) = &global.password {
        cfg.password = Some(password.clone());
    }
    if global.poll_interval.is_some() {
        cfg.poll_interval = global.poll_interval;
    }
    if global.timeout.is_some() {
        cfg.timeout = global.timeout;
    }
    cfg
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn parse(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["hivekit"];
        argv.extend_from_slice(args);
        argv.push("status");
        Cli::try_parse_from(argv).unwrap().global
    }

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "username = \"from-file\"\npassword = \"file-pw\"\npoll_interval = 120"
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let global = parse(&["--config", path, "--username", "from-flag", "--poll-interval", "5"]);
        let config = resolve(&global).unwrap();

        assert_eq!(config.username, "from-flag");
        assert_eq!(config.poll_interval, Some(Duration::from_secs(5)));
    }

    #[test]
    fn file_fills_what_flags_leave_out() {
        let cfg = Config {
            username: Some("from-file".into()),
            password: Some("file-pw".into()),
            timeout: Some(20),
            ..Config::default()
        };
        let global = parse(&[]);
        let merged = apply_overrides(cfg, &global);

        assert_eq!(merged.timeout, Some(20));
        assert!(merged.password.is_some());
    }
}

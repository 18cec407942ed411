//! Clap derive structures for the `hivekit` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use hivekit_core::HeatingMode;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// hivekit -- Hive Home heating from the command line
#[derive(Debug, Parser)]
#[command(
    name = "hivekit",
    version,
    about = "Read and control Hive Home heating and hot water",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Hive account username (email address)
    #[arg(long, short = 'u', env = "HIVEKIT_USER", global = true)]
    pub username: Option<String>,

    /// Hive account password
    #[arg(long, env = "HIVEKIT_PASS", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Config file to read instead of the platform default
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Seconds between polls (minimum 1, default 60)
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the current state as JSON
    #[command(alias = "st")]
    Status,

    /// Print every state change as a JSON line until interrupted
    Watch,

    /// Set the target temperature
    #[command(name = "set-temp")]
    SetTemp(SetTempArgs),

    /// Boost the heating, or cancel a boost
    #[command(name = "boost-heating")]
    BoostHeating(BoostArgs),

    /// Boost the hot water, or cancel a boost
    #[command(name = "boost-water")]
    BoostWater(BoostArgs),

    /// Switch the heating mode
    Mode(ModeArgs),
}

#[derive(Debug, Args)]
pub struct SetTempArgs {
    /// Target in degrees Celsius
    #[arg(allow_negative_numbers = true)]
    pub celsius: f64,
}

#[derive(Debug, Args)]
pub struct BoostArgs {
    /// Boost length in minutes
    #[arg(long, short = 'm', default_value_t = 60)]
    pub minutes: u64,

    /// Cancel the boost and return to the schedule
    #[arg(long)]
    pub off: bool,
}

#[derive(Debug, Args)]
pub struct ModeArgs {
    pub mode: ModeArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Heating disabled
    Off,
    /// Heat regardless of the schedule
    Heating,
    /// Follow the programmed schedule
    Scheduled,
}

impl From<ModeArg> for HeatingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Off => Self::Off,
            ModeArg::Heating => Self::Heating,
            ModeArg::Scheduled => Self::Scheduled,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn boost_defaults_to_an_hour() {
        let cli = Cli::try_parse_from(["hivekit", "boost-water"]).unwrap();
        match cli.command {
            Command::BoostWater(args) => {
                assert_eq!(args.minutes, 60);
                assert!(!args.off);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "hivekit",
            "mode",
            "scheduled",
            "--username",
            "bobby@charlton.com",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.global.username.as_deref(), Some("bobby@charlton.com"));
        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Mode(ModeArgs {
                mode: ModeArg::Scheduled
            })
        ));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["hivekit", "mode", "turbo"]).is_err());
    }
}

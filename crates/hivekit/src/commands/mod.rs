//! Command handlers. Each one runs against a connected `Hive`.

mod control;
mod status;

use hivekit_core::Hive;

use crate::cli::Command;
use crate::error::CliError;

/// Route a parsed command to its handler.
pub async fn dispatch(cmd: Command, hive: &Hive) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::show(hive).await,
        Command::Watch => status::watch(hive).await,
        Command::SetTemp(args) => control::set_temp(hive, &args).await,
        Command::BoostHeating(args) => control::boost_heating(hive, &args).await,
        Command::BoostWater(args) => control::boost_water(hive, &args).await,
        Command::Mode(args) => control::mode(hive, &args).await,
    }
}

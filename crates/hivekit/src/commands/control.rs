//! Commands that change the installation.

use std::time::Duration;

use hivekit_core::{HeatingMode, Hive, MAX_TEMP, MIN_TEMP};

use crate::cli::{BoostArgs, ModeArgs, SetTempArgs};
use crate::error::CliError;

pub async fn set_temp(hive: &Hive, args: &SetTempArgs) -> Result<(), CliError> {
    check_temperature(args.celsius)?;
    hive.set_target_temperature(args.celsius).await?;
    eprintln!("Target temperature set to {:.1}°C", args.celsius);
    Ok(())
}

pub async fn boost_heating(hive: &Hive, args: &BoostArgs) -> Result<(), CliError> {
    hive.toggle_heating_boost(!args.off, boost_length(args)).await?;
    report_boost("Heating", args);
    Ok(())
}

pub async fn boost_water(hive: &Hive, args: &BoostArgs) -> Result<(), CliError> {
    hive.toggle_hot_water(!args.off, boost_length(args)).await?;
    report_boost("Hot water", args);
    Ok(())
}

pub async fn mode(hive: &Hive, args: &ModeArgs) -> Result<(), CliError> {
    let mode = HeatingMode::from(args.mode);
    hive.set_target_heating_mode(mode).await?;
    eprintln!("Heating mode set to {mode}");
    Ok(())
}

fn boost_length(args: &BoostArgs) -> Duration {
    Duration::from_secs(args.minutes.saturating_mul(60))
}

fn report_boost(what: &str, args: &BoostArgs) {
    if args.off {
        eprintln!("{what} boost cancelled");
    } else {
        eprintln!("{what} boosted for {} minutes", args.minutes);
    }
}

/// The thermostat accepts `MIN_TEMP..=MAX_TEMP`; the core forwards values
/// unchecked, so the range is enforced here.
fn check_temperature(celsius: f64) -> Result<(), CliError> {
    if (MIN_TEMP..=MAX_TEMP).contains(&celsius) {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: "celsius".into(),
            reason: format!("{celsius} is outside {MIN_TEMP}..={MAX_TEMP}"),
        })
    }
}

//! `status` and `watch`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use hivekit_core::{Hive, State};

use crate::error::CliError;

#[derive(Serialize)]
struct StatusView<'a> {
    #[serde(flatten)]
    state: &'a State,
    last_refresh: Option<DateTime<Utc>>,
}

pub async fn show(hive: &Hive) -> Result<(), CliError> {
    let Some(last_refresh) = hive.last_refresh().await else {
        return Err(CliError::NoState);
    };
    let state = hive.state().await;
    let view = StatusView {
        state: &state,
        last_refresh: Some(last_refresh),
    };
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

/// Print each snapshot as one JSON line until Ctrl-C.
pub async fn watch(hive: &Hive) -> Result<(), CliError> {
    hive.register_change_handler(|state: &State| match serde_json::to_string(state) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "failed to encode state"),
    })
    .await;

    tokio::signal::ctrl_c().await?;
    Ok(())
}

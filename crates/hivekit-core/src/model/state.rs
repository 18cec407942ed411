// ── Heating state snapshot ──

use serde::{Deserialize, Serialize};
use strum::Display;

/// Lowest target temperature the thermostat accepts, Celsius.
pub const MIN_TEMP: f64 = 1.0;

/// Highest target temperature the thermostat accepts, Celsius.
pub const MAX_TEMP: f64 = 32.0;

/// What the heating is doing, or has been asked to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HeatingMode {
    /// Heating disabled.
    #[default]
    Off,
    /// Heating on regardless of schedule (boost or manual).
    Heating,
    /// Following the programmed schedule.
    Scheduled,
}

/// Last known state of the installation.
///
/// Zero-valued until the first successful poll. Each successful poll
/// produces a whole new value; callers only ever see copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Heating relay energised.
    pub heating: bool,
    pub heating_boosted: bool,
    pub current_heating_mode: HeatingMode,
    pub target_heating_mode: HeatingMode,
    /// Measured temperature, Celsius.
    pub current_temp: f64,
    /// Target temperature, Celsius.
    pub target_temp: f64,
    /// Hot-water relay energised.
    pub hot_water: bool,
    pub hot_water_boosted: bool,
    /// Node addressed by heating commands. Empty until one is seen.
    pub heating_node_id: String,
    /// Node addressed by hot-water commands. Empty until one is seen.
    pub hot_water_node_id: String,
}

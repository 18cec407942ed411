// ── Command API ──
//
// Every write goes through the `Command` enum. A command knows which node
// it addresses and the partial attribute update it sends; `Hive::execute`
// does the rest.

use std::time::Duration;

use hivekit_api::nodes::{MODE_BOOST, MODE_HEAT, MODE_OFF};
use hivekit_api::{NodeAttributes, NodeUpdate, Report};

use crate::model::HeatingMode;

/// All write operations against a Hive installation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Set the thermostat target, Celsius. Not clamped: keeping it within
    /// [`MIN_TEMP`](crate::MIN_TEMP)..=[`MAX_TEMP`](crate::MAX_TEMP) is the
    /// caller's job.
    SetTargetTemperature { celsius: f64 },
    /// Boost hot water for `duration`, or return it to its schedule.
    ToggleHotWater { on: bool, duration: Duration },
    /// Boost heating for `duration`, or return it to its schedule.
    ToggleHeatingBoost { on: bool, duration: Duration },
    /// Switch the heating off, to manual, or back to its schedule.
    SetTargetHeatingMode { mode: HeatingMode },
}

/// Which cached node id a command is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTarget {
    Heating,
    HotWater,
}

impl Command {
    pub fn target(&self) -> NodeTarget {
        match self {
            Self::ToggleHotWater { .. } => NodeTarget::HotWater,
            Self::SetTargetTemperature { .. }
            | Self::ToggleHeatingBoost { .. }
            | Self::SetTargetHeatingMode { .. } => NodeTarget::Heating,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetTargetTemperature { .. } => "set_target_temperature",
            Self::ToggleHotWater { .. } => "toggle_hot_water",
            Self::ToggleHeatingBoost { .. } => "toggle_heating_boost",
            Self::SetTargetHeatingMode { .. } => "set_target_heating_mode",
        }
    }

    /// The partial node update this command sends.
    pub fn to_update(&self) -> NodeUpdate {
        let attributes = match *self {
            Self::SetTargetTemperature { celsius } => NodeAttributes {
                target_heat_temperature: Some(Report::target(celsius)),
                ..NodeAttributes::default()
            },
            Self::ToggleHotWater { on, duration } | Self::ToggleHeatingBoost { on, duration } => {
                boost(on, duration)
            }
            Self::SetTargetHeatingMode { mode } => heating_mode(mode),
        };
        NodeUpdate { attributes }
    }
}

fn boost(on: bool, duration: Duration) -> NodeAttributes {
    if on {
        let minutes = i64::try_from(duration.as_secs() / 60).unwrap_or(i64::MAX);
        NodeAttributes {
            active_heat_cool_mode: Some(Report::target(MODE_BOOST.to_owned())),
            schedule_lock_duration: Some(Report::target(minutes)),
            ..NodeAttributes::default()
        }
    } else {
        NodeAttributes {
            active_heat_cool_mode: Some(Report::target(MODE_HEAT.to_owned())),
            active_schedule_lock: Some(Report::target(false)),
            ..NodeAttributes::default()
        }
    }
}

fn heating_mode(mode: HeatingMode) -> NodeAttributes {
    match mode {
        HeatingMode::Off => NodeAttributes {
            active_heat_cool_mode: Some(Report::target(MODE_OFF.to_owned())),
            ..NodeAttributes::default()
        },
        HeatingMode::Heating => NodeAttributes {
            active_heat_cool_mode: Some(Report::target(MODE_HEAT.to_owned())),
            active_schedule_lock: Some(Report::target(true)),
            ..NodeAttributes::default()
        },
        HeatingMode::Scheduled => NodeAttributes {
            active_heat_cool_mode: Some(Report::target(MODE_HEAT.to_owned())),
            active_schedule_lock: Some(Report::target(false)),
            ..NodeAttributes::default()
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(command: &Command) -> serde_json::Value {
        serde_json::to_value(command.to_update()).unwrap()
    }

    #[test]
    fn target_temperature_is_not_clamped() {
        let cmd = Command::SetTargetTemperature { celsius: 40.0 };
        assert_eq!(cmd.target(), NodeTarget::Heating);
        assert_eq!(
            body(&cmd),
            json!({ "attributes": { "targetHeatTemperature": { "targetValue": 40.0 } } })
        );
    }

    #[test]
    fn hot_water_boost_on() {
        let cmd = Command::ToggleHotWater {
            on: true,
            duration: Duration::from_secs(90 * 60),
        };
        assert_eq!(cmd.target(), NodeTarget::HotWater);
        assert_eq!(
            body(&cmd),
            json!({ "attributes": {
                "activeHeatCoolMode": { "targetValue": "BOOST" },
                "scheduleLockDuration": { "targetValue": 90 }
            } })
        );
    }

    #[test]
    fn heating_boost_off_clears_schedule_lock() {
        let cmd = Command::ToggleHeatingBoost {
            on: false,
            duration: Duration::from_secs(3600),
        };
        assert_eq!(cmd.target(), NodeTarget::Heating);
        assert_eq!(
            body(&cmd),
            json!({ "attributes": {
                "activeHeatCoolMode": { "targetValue": "HEAT" },
                "activeScheduleLock": { "targetValue": false }
            } })
        );
    }

    #[test]
    fn boost_duration_rounds_down_to_minutes() {
        let cmd = Command::ToggleHeatingBoost {
            on: true,
            duration: Duration::from_secs(119),
        };
        assert_eq!(
            body(&cmd)["attributes"]["scheduleLockDuration"]["targetValue"],
            json!(1)
        );
    }

    #[test]
    fn manual_heating_locks_schedule() {
        let cmd = Command::SetTargetHeatingMode {
            mode: HeatingMode::Heating,
        };
        assert_eq!(
            body(&cmd),
            json!({ "attributes": {
                "activeHeatCoolMode": { "targetValue": "HEAT" },
                "activeScheduleLock": { "targetValue": true }
            } })
        );
    }

    #[test]
    fn heating_off() {
        let cmd = Command::SetTargetHeatingMode {
            mode: HeatingMode::Off,
        };
        assert_eq!(
            body(&cmd),
            json!({ "attributes": { "activeHeatCoolMode": { "targetValue": "OFF" } } })
        );
    }
}

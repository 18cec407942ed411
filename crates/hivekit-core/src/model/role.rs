// ── Node role inference ──
//
// Nodes carry no type tag. Which attributes are present decides what a
// node is; this is the only place that decision is made.

use hivekit_api::NodeAttributes;

/// What a node is, as far as this client cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Thermostat: reports a temperature and has a target temperature.
    Heating,
    /// Hot-water controller: reports `supportsHotWater = true`.
    HotWater,
    /// Combined receiver satisfying both of the above.
    Both,
    /// Anything else (hubs, plugs, lights, ...).
    Unknown,
}

impl NodeRole {
    pub fn of(attrs: &NodeAttributes) -> Self {
        let heating = attrs.temperature.is_some() && attrs.target_heat_temperature.is_some();
        let hot_water = attrs
            .supports_hot_water
            .as_ref()
            .and_then(|r| r.reported_value)
            .unwrap_or(false);

        match (heating, hot_water) {
            (true, true) => Self::Both,
            (true, false) => Self::Heating,
            (false, true) => Self::HotWater,
            (false, false) => Self::Unknown,
        }
    }

    pub fn is_heating(self) -> bool {
        matches!(self, Self::Heating | Self::Both)
    }

    pub fn is_hot_water(self) -> bool {
        matches!(self, Self::HotWater | Self::Both)
    }
}

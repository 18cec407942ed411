// Omnia node wire types
//
// Models for the `/omnia/nodes` resource. Every attribute on a node is
// optional; which attributes are present is what distinguishes a thermostat
// from a hot-water controller. Fields use `#[serde(default)]` throughout
// because the API omits whatever a device does not support.

use serde::{Deserialize, Serialize};

// ── Attribute values ─────────────────────────────────────────────────

/// Relay reported as energised.
pub const RELAY_ON: &str = "ON";

/// `activeHeatCoolMode` values understood by the API.
pub const MODE_OFF: &str = "OFF";
pub const MODE_HEAT: &str = "HEAT";
pub const MODE_BOOST: &str = "BOOST";

// ── Envelope ─────────────────────────────────────────────────────────

/// Body of `GET /omnia/nodes`, and the outer shape of every node update.
///
/// ```json
/// { "nodes": [ { "id": "...", "attributes": { ... } } ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesReply {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

// ── Node ─────────────────────────────────────────────────────────────

/// A single device record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<i64>,
    #[serde(default)]
    pub attributes: NodeAttributes,
}

/// The attributes this client reads or writes. Everything else the API
/// sends is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_heat_cool_mode: Option<Report<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_schedule_lock: Option<Report<bool>>,
    /// Boost length in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_lock_duration: Option<Report<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_heating_relay: Option<Report<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_hot_water_relay: Option<Report<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supports_hot_water: Option<Report<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_heat_temperature: Option<Report<f64>>,
    /// Measured temperature, Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Report<f64>>,
}

/// A `{ reportedValue, targetValue }` pair.
///
/// `reportedValue` is what the device last said; `targetValue` is what was
/// last requested of it. Updates only ever carry a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_value: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<T>,
}

impl<T> Report<T> {
    /// A report carrying only a requested value, as sent in updates.
    pub fn target(value: T) -> Self {
        Self {
            reported_value: None,
            target_value: Some(value),
        }
    }

    /// A report carrying only a device-reported value.
    pub fn reported(value: T) -> Self {
        Self {
            reported_value: Some(value),
            target_value: None,
        }
    }
}

// ── Updates ──────────────────────────────────────────────────────────

/// Partial attribute update for a single node (`PUT /omnia/nodes/{id}`).
///
/// The node is addressed by the URL; the body carries no id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeUpdate {
    pub attributes: NodeAttributes,
}

#[derive(Serialize)]
pub(crate) struct NodeUpdateRequest<'a> {
    pub nodes: [&'a NodeUpdate; 1],
}

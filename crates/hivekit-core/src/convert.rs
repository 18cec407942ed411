// ── Node list to domain state ──
//
// Folds the raw `/omnia/nodes` list into a flat `State`. Pure and total:
// missing attributes leave the matching fields at their zero value, and
// nothing is rejected. If two nodes claim the same role the later one wins.

use hivekit_api::Node;
use hivekit_api::nodes::{MODE_BOOST, MODE_OFF, RELAY_ON};

use crate::model::{HeatingMode, NodeRole, State};

/// Reduce a node list to a `State`.
pub fn reduce(nodes: &[Node]) -> State {
    let mut state = State::default();
    for node in nodes {
        let role = NodeRole::of(&node.attributes);
        if role.is_heating() {
            apply_heating(&mut state, node);
        }
        if role.is_hot_water() {
            apply_hot_water(&mut state, node);
        }
    }
    state
}

/// BOOST is Heating, OFF is Off, anything else (HEAT, absent, unknown) is
/// the schedule.
fn heating_mode(value: Option<&str>) -> HeatingMode {
    match value {
        Some(MODE_BOOST) => HeatingMode::Heating,
        Some(MODE_OFF) => HeatingMode::Off,
        _ => HeatingMode::Scheduled,
    }
}

fn apply_heating(state: &mut State, node: &Node) {
    let attrs = &node.attributes;
    state.heating_node_id.clone_from(&node.id);

    state.current_temp = attrs
        .temperature
        .as_ref()
        .and_then(|r| r.reported_value)
        .unwrap_or_default();
    state.target_temp = attrs
        .target_heat_temperature
        .as_ref()
        .and_then(|r| r.reported_value.or(r.target_value))
        .unwrap_or_default();

    if let Some(relay) = &attrs.state_heating_relay {
        state.heating = relay.reported_value.as_deref() == Some(RELAY_ON);
    }

    if let Some(mode) = &attrs.active_heat_cool_mode {
        let reported = mode.reported_value.as_deref();
        state.heating_boosted = reported == Some(MODE_BOOST);
        state.current_heating_mode = heating_mode(reported);
        state.target_heating_mode = heating_mode(mode.target_value.as_deref());
    }
}

fn apply_hot_water(state: &mut State, node: &Node) {
    let attrs = &node.attributes;
    state.hot_water_node_id.clone_from(&node.id);

    if let Some(relay) = &attrs.state_hot_water_relay {
        state.hot_water = relay.reported_value.as_deref() == Some(RELAY_ON);
    }

    // Same field as the heating boost; the API exposes nothing separate.
    if let Some(mode) = &attrs.active_heat_cool_mode {
        state.hot_water_boosted = mode.reported_value.as_deref() == Some(MODE_BOOST);
    }
}

//! Modem discovery
//!
//! `NoModem -> Selecting -> Active`. The first modem exposing network
//! registration becomes the active and preferred call manager; others are
//! ignored for as long as it stays.

use serde_json::Value;

use hfpgw_core::prelude::*;
use hfpgw_core::{ModemState, NetworkState, Properties, RegistrationStatus};
use hfpgw_modem::commands::OFONO_NETWORKREG_INTERFACE;
use hfpgw_modem::{parse_object_list, parse_properties, OfonoCommand, ReplyRoute};

use super::calls::{finalize_call, register_call};
use super::indicators::refresh_indicators;
use super::UpdateResult;
use crate::state::AppState;

/// oFono came onto the bus: list its modems
pub(crate) fn service_appeared(state: &mut AppState) -> UpdateResult {
    info!("oFono service appeared");

    if state.modem == ModemState::NoModem {
        state.modem = ModemState::Selecting;
    }

    if let Err(e) = state
        .sender
        .issue(OfonoCommand::GetModems, Some(ReplyRoute::GetModems))
    {
        warn!("Unable to send GetModems: {}", e);
    }
    UpdateResult::none()
}

/// oFono left the bus: tear down as if the active modem was removed
pub(crate) fn service_vanished(state: &mut AppState) -> UpdateResult {
    info!("oFono service vanished");

    // Nothing the old service instance owed us can still be answered
    let cancelled = state.sender.tracker().cancel_all();
    if cancelled > 0 {
        debug!("Dropped {} requests to the vanished service", cancelled);
    }

    match state.active_manager() {
        Some(path) => modem_removed(state, &path),
        None => {
            state.modem = ModemState::NoModem;
            UpdateResult::none()
        }
    }
}

pub(crate) fn get_modems_reply(state: &mut AppState, body: &[Value]) -> UpdateResult {
    if state.modem.is_active() {
        debug!("Modem already active, ignoring GetModems reply");
        return UpdateResult::none();
    }

    let modems = match parse_object_list(body) {
        Ok(modems) => modems,
        Err(e) => {
            warn!("Unexpected GetModems reply: {}", e);
            return UpdateResult::none();
        }
    };

    for (path, props) in modems {
        modem_added(state, &path, &props);
        if state.modem.is_active() {
            break;
        }
    }
    UpdateResult::none()
}

pub(crate) fn modem_added(state: &mut AppState, path: &str, props: &Properties) -> UpdateResult {
    if let Some(active) = state.modem.active_path() {
        debug!("Ignoring modem {} while {} is active", path, active);
        return UpdateResult::none();
    }

    let Some(interfaces) = props.get("Interfaces") else {
        debug!("Modem {} has no interfaces yet", path);
        state.modem = ModemState::Selecting;
        return UpdateResult::none();
    };

    match has_network_registration(interfaces) {
        Some(true) => activate_modem(state, path),
        Some(false) => {
            debug!("Modem {} lacks network registration", path);
            state.modem = ModemState::Selecting;
        }
        None => warn!("Modem {}: Interfaces is not a string array", path),
    }
    UpdateResult::none()
}

pub(crate) fn modem_removed(state: &mut AppState, path: &str) -> UpdateResult {
    if !state.is_active_manager(path) {
        debug!("Ignoring removal of inactive modem {}", path);
        return UpdateResult::none();
    }

    info!("Modem {} removed", path);

    let mut result = UpdateResult::none();
    for call in state.registry.clear() {
        result.merge(finalize_call(state, call));
    }

    state.network = NetworkState::default();
    state.modem = ModemState::NoModem;
    refresh_indicators(state);
    result
}

/// `Modem.PropertyChanged`: only `Interfaces` matters
pub(crate) fn modem_property_changed(
    state: &mut AppState,
    path: &str,
    name: &str,
    value: &Value,
) -> UpdateResult {
    if name != "Interfaces" {
        return UpdateResult::none();
    }

    if let Some(active) = state.modem.active_path() {
        if active != path {
            return UpdateResult::none();
        }
    }

    let Some(has_netreg) = has_network_registration(value) else {
        warn!("Modem {}: Interfaces is not a string array", path);
        return UpdateResult::none();
    };

    match (state.is_active_manager(path), has_netreg) {
        (true, false) => modem_removed(state, path),
        (false, true) => {
            activate_modem(state, path);
            UpdateResult::none()
        }
        _ => UpdateResult::none(),
    }
}

fn activate_modem(state: &mut AppState, path: &str) {
    info!("Using modem {}", path);
    state.modem = ModemState::Active(path.to_string());

    let command = OfonoCommand::GetNetworkProperties {
        modem: path.to_string(),
    };
    let route = ReplyRoute::NetworkProperties {
        manager: path.to_string(),
    };
    if let Err(e) = state.sender.issue(command, Some(route)) {
        warn!("Unable to send {}.GetProperties: {}", OFONO_NETWORKREG_INTERFACE, e);
    }
}

/// `Some(true)` if the interface list contains network registration,
/// `None` if the value is not a list of strings
fn has_network_registration(interfaces: &Value) -> Option<bool> {
    let list = interfaces.as_array()?;
    let mut found = false;
    for iface in list {
        if iface.as_str()? == OFONO_NETWORKREG_INTERFACE {
            found = true;
        }
    }
    Some(found)
}

// ─────────────────────────────────────────────────────────
// Network registration
// ─────────────────────────────────────────────────────────

pub(crate) fn network_properties_reply(
    state: &mut AppState,
    manager: &str,
    body: &[Value],
) -> UpdateResult {
    if !state.is_active_manager(manager) {
        debug!("Stale network properties for {}", manager);
        return UpdateResult::none();
    }

    match parse_properties(body) {
        Ok(props) => {
            for (name, value) in &props {
                if let Err(e) = apply_network_property(&mut state.network, name, value) {
                    warn!("Ignoring network property {}: {}", name, e);
                }
            }
        }
        Err(e) => warn!("Unexpected GetProperties reply: {}", e),
    }

    let command = OfonoCommand::GetCalls {
        manager: manager.to_string(),
    };
    let route = ReplyRoute::GetCalls {
        manager: manager.to_string(),
    };
    if let Err(e) = state.sender.issue(command, Some(route)) {
        warn!("Unable to send GetCalls: {}", e);
    }

    refresh_indicators(state);
    UpdateResult::none()
}

pub(crate) fn get_calls_reply(state: &mut AppState, manager: &str, body: &[Value]) -> UpdateResult {
    if !state.is_active_manager(manager) {
        debug!("Stale call list for {}", manager);
        return UpdateResult::none();
    }

    match parse_object_list(body) {
        Ok(calls) => {
            for (path, props) in &calls {
                register_call(state, path, manager, props);
            }
        }
        Err(e) => warn!("Unexpected GetCalls reply: {}", e),
    }

    refresh_indicators(state);
    UpdateResult::none()
}

/// `NetworkRegistration.PropertyChanged`
pub(crate) fn network_property_changed(
    state: &mut AppState,
    path: &str,
    name: &str,
    value: &Value,
) -> UpdateResult {
    if !state.is_active_manager(path) {
        debug!("Ignoring network property {} from {}", name, path);
        return UpdateResult::none();
    }

    if let Err(e) = apply_network_property(&mut state.network, name, value) {
        warn!("Dropping network property change {}: {}", name, e);
        return UpdateResult::none();
    }

    refresh_indicators(state);
    UpdateResult::none()
}

/// Apply one registration property; unknown names are ignored
pub(crate) fn apply_network_property(
    network: &mut NetworkState,
    name: &str,
    value: &Value,
) -> Result<()> {
    match name {
        "Status" => {
            let status = value
                .as_str()
                .ok_or_else(|| Error::protocol("Status is not a string"))?;
            network.status = RegistrationStatus::from_ofono(status);
        }
        "Name" => {
            let operator = value
                .as_str()
                .ok_or_else(|| Error::protocol("Name is not a string"))?;
            network.operator = Some(operator.to_string());
        }
        "Strength" => {
            let strength = value
                .as_u64()
                .ok_or_else(|| Error::protocol("Strength is not an integer"))?;
            network.strength = strength.min(100) as u8;
        }
        _ => {}
    }
    Ok(())
}

//! oFono signal handlers
//!
//! Call lifecycle signals from the active call manager and per-call
//! property changes. Modem and network registration signals are handled
//! in `discovery`.

use serde_json::Value;

use hfpgw_core::prelude::*;
use hfpgw_core::{CallDirection, CallStatus, HfpEvent, OfonoSignal, Properties};

use super::calls::{register_call, remove_call};
use super::discovery;
use super::indicators::refresh_indicators;
use super::{UpdateAction, UpdateResult};
use crate::state::AppState;

pub(crate) fn handle_signal(state: &mut AppState, signal: OfonoSignal) -> UpdateResult {
    match signal {
        OfonoSignal::ModemAdded { path, properties } => {
            discovery::modem_added(state, &path, &properties)
        }
        OfonoSignal::ModemRemoved { path } => discovery::modem_removed(state, &path),
        OfonoSignal::ModemPropertyChanged { path, name, value } => {
            discovery::modem_property_changed(state, &path, &name, &value)
        }
        OfonoSignal::NetworkPropertyChanged { path, name, value } => {
            discovery::network_property_changed(state, &path, &name, &value)
        }
        OfonoSignal::CallAdded {
            manager,
            path,
            properties,
        } => call_added(state, &manager, &path, &properties),
        OfonoSignal::CallRemoved { manager, path } => call_removed(state, &manager, &path),
        OfonoSignal::CallPropertyChanged { path, name, value } => {
            call_property_changed(state, &path, &name, &value)
        }
    }
}

fn call_added(state: &mut AppState, manager: &str, path: &str, props: &Properties) -> UpdateResult {
    if !state.is_active_manager(manager) {
        debug!("Ignoring call {} from inactive manager {}", path, manager);
        return UpdateResult::none();
    }

    register_call(state, path, manager, props);
    refresh_indicators(state);
    UpdateResult::none()
}

fn call_removed(state: &mut AppState, manager: &str, path: &str) -> UpdateResult {
    if !state.is_active_manager(manager) {
        debug!("Ignoring removal of {} from inactive manager {}", path, manager);
        return UpdateResult::none();
    }

    remove_call(state, path)
}

/// `VoiceCall.PropertyChanged`
pub(crate) fn call_property_changed(
    state: &mut AppState,
    path: &str,
    name: &str,
    value: &Value,
) -> UpdateResult {
    if state.registry.find(path).is_none() {
        debug!("Property {} for unknown call {}", name, path);
        return UpdateResult::none();
    }

    match name {
        "State" => match value.as_str() {
            Some(s) => match CallStatus::from_ofono(s) {
                Some(status) => call_state_changed(state, path, status),
                None => {
                    warn!("Call {}: unknown state '{}'", path, s);
                    UpdateResult::none()
                }
            },
            None => {
                warn!("Call {}: State is not a string", path);
                UpdateResult::none()
            }
        },
        "Multiparty" => {
            match (value.as_bool(), state.registry.find_mut(path)) {
                (Some(conference), Some(call)) => call.conference = conference,
                (None, _) => warn!("Call {}: Multiparty is not a boolean", path),
                _ => {}
            }
            UpdateResult::none()
        }
        "LineIdentification" => {
            match (value.as_str(), state.registry.find_mut(path)) {
                (Some(number), Some(call)) => {
                    call.number = (!number.is_empty()).then(|| number.to_string());
                }
                (None, _) => warn!("Call {}: LineIdentification is not a string", path),
                _ => {}
            }
            UpdateResult::none()
        }
        _ => {
            trace!("Call {}: ignoring property {}", path, name);
            UpdateResult::none()
        }
    }
}

fn call_state_changed(state: &mut AppState, path: &str, status: CallStatus) -> UpdateResult {
    state.registry.clear_pending(path);

    if status == CallStatus::Disconnected {
        return remove_call(state, path);
    }

    let hold_delay = state.settings.dial.hold_dial_delay();
    let active_manager = state.active_manager();

    let Some(call) = state.registry.find_mut(path) else {
        return UpdateResult::none();
    };

    let previous = call.status;
    debug!("Call {}: {} -> {}", path, previous, status);

    let mut events = Vec::new();
    let mut result = UpdateResult::none();

    match status {
        CallStatus::Active => {
            if previous == CallStatus::Incoming {
                events.push(HfpEvent::CallingStopped);
            }
            call.status = CallStatus::Active;
            call.waiting_for_answer = false;
        }
        CallStatus::Alerting => {
            call.status = CallStatus::Alerting;
            call.direction = CallDirection::Originating;
        }
        CallStatus::Incoming => {
            events.push(HfpEvent::IncomingCall {
                number: call.number.clone().unwrap_or_default(),
                number_type: call.number_type().code(),
                waiting: call.waiting_for_answer,
            });
            call.waiting_for_answer = false;
            call.status = CallStatus::Incoming;
            call.direction = CallDirection::Terminating;
        }
        CallStatus::Held => {
            call.status = CallStatus::Held;
            if let Some(dial) = call.hold_dial.take() {
                match active_manager {
                    Some(manager) => {
                        result.actions.push(UpdateAction::ScheduleDial {
                            call: path.to_string(),
                            manager,
                            dial,
                            delay: hold_delay,
                        });
                    }
                    None => warn!("Dropping stashed dial for {}: no active modem", path),
                }
            }
        }
        CallStatus::Dialing | CallStatus::Waiting => call.status = status,
        CallStatus::Disconnected => {}
    }

    if previous == CallStatus::Held && status != CallStatus::Held {
        result.actions.push(UpdateAction::CancelDial {
            call: path.to_string(),
        });
    }

    for event in events {
        state.emit(event);
    }
    refresh_indicators(state);
    result
}

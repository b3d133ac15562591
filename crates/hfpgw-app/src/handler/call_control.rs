//! HFP request handling
//!
//! Every request except device connect/disconnect produces exactly one
//! `HfpEvent::Response`. Control operations are issued with a control
//! route so a rejected or expired operation releases the pending-status
//! gate on the indicators and drops any intent stashed for its reply.

use std::fs;

use hfpgw_core::prelude::*;
use hfpgw_core::{
    AgFeatures, AgSuppFeatures, CallStatus, ClirMode, HfpEvent, HfpRequest, PendingDial,
};
use hfpgw_modem::{OfonoCommand, ReplyRoute};

use super::UpdateResult;
use crate::state::AppState;

/// Outcome reported to the HF for one request
pub(crate) type CmeResult = std::result::Result<(), CmeError>;

pub(crate) fn handle_request(state: &mut AppState, request: HfpRequest) -> UpdateResult {
    let kind = request.kind();
    debug!("HFP request {:?}", request);

    let result = match request {
        HfpRequest::DeviceConnected => {
            device_connected(state);
            return UpdateResult::none();
        }
        HfpRequest::DeviceDisconnected => {
            info!("HF disconnected, event reporting off");
            state.events_enabled = false;
            return UpdateResult::none();
        }
        HfpRequest::EventReporting { enable } => {
            state.events_enabled = enable;
            Ok(())
        }
        HfpRequest::ResponseAndHold => Err(CmeError::NotSupported),
        HfpRequest::LastDialedNumber => last_dialed_number(state),
        HfpRequest::TerminateCall => terminate_call(state),
        HfpRequest::AnswerCall => answer_call(state),
        HfpRequest::DialNumber { number } => dial_number(state, &number),
        HfpRequest::TransmitDtmf { tone } => transmit_dtmf(state, tone),
        HfpRequest::SubscriberNumber => Ok(()),
        HfpRequest::ListCurrentCalls => {
            list_current_calls(state);
            Ok(())
        }
        HfpRequest::OperatorSelection => {
            let name = state.network.operator.clone().unwrap_or_default();
            state.emit(HfpEvent::OperatorSelection { mode: 0, name });
            Ok(())
        }
        HfpRequest::CallHold { command } => call_hold(state, &command),
        HfpRequest::NrAndEc { enable } => {
            debug!("NR/EC {}", if enable { "enabled" } else { "disabled" });
            Ok(())
        }
        HfpRequest::KeyPress { keys } => key_press(state, &keys),
        HfpRequest::VoiceDial { .. } => Err(CmeError::NotSupported),
    };

    if let Err(e) = &result {
        debug!("{:?} rejected: {}", kind, e);
    }
    state.emit(HfpEvent::response(kind, result));
    UpdateResult::none()
}

/// Issue a control operation against `manager`
fn control(state: &AppState, manager: &str, command: OfonoCommand) -> CmeResult {
    let route = ReplyRoute::CallControl {
        manager: manager.to_string(),
    };
    control_via(state, command, route)
}

fn control_via(state: &AppState, command: OfonoCommand, route: ReplyRoute) -> CmeResult {
    let description = command.description();
    state.sender.issue(command, Some(route)).map(|_| ()).map_err(|e| {
        warn!("Failed to {}: {}", description, e);
        CmeError::AgFailure
    })
}

fn answer(state: &AppState, call: &str, manager: &str) -> CmeResult {
    control(
        state,
        manager,
        OfonoCommand::Answer {
            call: call.to_string(),
        },
    )
}

fn hangup(state: &AppState, call: &str, manager: &str) -> CmeResult {
    control(
        state,
        manager,
        OfonoCommand::Hangup {
            call: call.to_string(),
        },
    )
}

/// Path and manager of the first call in `status`
fn first_with_status(state: &AppState, status: CallStatus) -> Option<(String, String)> {
    state
        .registry
        .find_by_status(status)
        .map(|c| (c.path.clone(), c.manager.clone()))
}

// ─────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────

/// Re-announce a ringing call to a newly connected HF
fn device_connected(state: &mut AppState) {
    let Some(incoming) = state.registry.find_by_status(CallStatus::Incoming) else {
        return;
    };

    let number = incoming.number.clone().unwrap_or_default();
    let number_type = incoming.number_type().code();

    let event = if state.registry.find_by_status(CallStatus::Active).is_some() {
        HfpEvent::CallWaiting {
            number,
            number_type,
        }
    } else {
        HfpEvent::IncomingCall {
            number,
            number_type,
            waiting: false,
        }
    };
    state.emit(event);
}

// ─────────────────────────────────────────────────────────
// Answer / terminate
// ─────────────────────────────────────────────────────────

fn answer_call(state: &AppState) -> CmeResult {
    let target = [CallStatus::Incoming, CallStatus::Alerting, CallStatus::Waiting]
        .into_iter()
        .find_map(|status| first_with_status(state, status));

    let Some((call, manager)) = target else {
        return Err(CmeError::NotAllowed);
    };
    answer(state, &call, &manager)
}

fn terminate_call(state: &AppState) -> CmeResult {
    let target = state
        .registry
        .find_by_status(CallStatus::Active)
        .or_else(|| state.registry.newest())
        .cloned();

    let Some(call) = target else {
        debug!("No call to terminate");
        return Err(CmeError::NotAllowed);
    };

    if call.status == CallStatus::Held {
        if let Some((alerting, manager)) = first_with_status(state, CallStatus::Alerting) {
            return hangup(state, &alerting, &manager);
        }
    }

    if call.conference {
        control(
            state,
            &call.manager,
            OfonoCommand::HangupMultiparty {
                manager: call.manager.clone(),
            },
        )
    } else {
        hangup(state, &call.path, &call.manager)
    }
}

fn key_press(state: &AppState, keys: &str) -> CmeResult {
    debug!("Key press {}", keys);

    if let Some((call, manager)) = first_with_status(state, CallStatus::Incoming) {
        answer(state, &call, &manager)
    } else if let Some((call, manager)) = first_with_status(state, CallStatus::Active) {
        hangup(state, &call, &manager)
    } else {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Dialing
// ─────────────────────────────────────────────────────────

fn dial_number(state: &mut AppState, number: &str) -> CmeResult {
    let Some(manager) = state.active_manager() else {
        return Err(CmeError::AgFailure);
    };

    if number.is_empty() {
        return Err(CmeError::AgFailure);
    }

    // Memory location 1 is the last dialed number; other locations are unsupported
    if number == ">1" {
        return last_dialed_number(state);
    }
    if number.starts_with('>') {
        return Err(CmeError::AgFailure);
    }

    place_dial(state, &manager, number)
}

fn last_dialed_number(state: &mut AppState) -> CmeResult {
    let number = match &state.settings.dial.last_number_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => contents.trim().to_string(),
            Err(e) => {
                debug!("Failed to read last dialed number from {}: {}", path.display(), e);
                return Err(CmeError::NotAllowed);
            }
        },
        None => state
            .last_dialed_number
            .clone()
            .ok_or(CmeError::NotAllowed)?,
    };

    let Some(manager) = state.active_manager() else {
        return Err(CmeError::AgFailure);
    };

    if number.is_empty() || number.starts_with('>') {
        return Err(CmeError::AgFailure);
    }

    info!("Redialing {}", number);
    place_dial(state, &manager, &number)
}

/// Dial `number`, first holding a lone active call
fn place_dial(state: &mut AppState, manager: &str, number: &str) -> CmeResult {
    let (number, clir) = ClirMode::split_prefix(number);
    let dial = PendingDial {
        number: number.to_string(),
        clir,
    };

    let lone_active = match state.registry.find_by_status(CallStatus::Active) {
        Some(call) if state.registry.len() == 1 => Some(call.path.clone()),
        _ => None,
    };

    let Some(active) = lone_active else {
        return control(
            state,
            manager,
            OfonoCommand::Dial {
                manager: manager.to_string(),
                number: dial.number,
                clir: dial.clir,
            },
        );
    };

    debug!("Holding {} before dialing", active);
    if let Some(call) = state.registry.find_mut(&active) {
        call.hold_dial = Some(dial);
    }

    let result = control_via(
        state,
        OfonoCommand::SwapCalls {
            manager: manager.to_string(),
        },
        ReplyRoute::HoldForDial {
            manager: manager.to_string(),
            call: active.clone(),
        },
    );
    if result.is_err() {
        if let Some(call) = state.registry.find_mut(&active) {
            call.hold_dial = None;
        }
    }
    result
}

fn transmit_dtmf(state: &AppState, tone: String) -> CmeResult {
    let Some(manager) = state.active_manager() else {
        return Err(CmeError::AgFailure);
    };

    control(
        state,
        &manager,
        OfonoCommand::SendTones {
            manager: manager.clone(),
            tones: tone,
        },
    )
}

// ─────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────

fn list_current_calls(state: &mut AppState) {
    let rows: Vec<HfpEvent> = state
        .registry
        .iter()
        .enumerate()
        .map(|(i, call)| HfpEvent::CurrentCall {
            index: i + 1,
            direction: call.direction.clcc_code(),
            status: call.status.clcc_code(),
            mode: 0,
            multiparty: call.conference,
            number: call.number.clone().unwrap_or_default(),
            number_type: call.number_type().code(),
        })
        .collect();

    for row in rows {
        state.emit(row);
    }
}

// ─────────────────────────────────────────────────────────
// +CHLD
// ─────────────────────────────────────────────────────────

/// `AT+CHLD=<command>`. On success every call of the manager is marked
/// pending until it reports its final state.
pub(crate) fn call_hold(state: &mut AppState, command: &str) -> CmeResult {
    let Some(manager) = state.active_manager() else {
        return Err(CmeError::AgFailure);
    };

    if !state.features.contains(AgFeatures::THREE_WAY_CALLING) {
        return Err(CmeError::NotSupported);
    }

    let mut chars = command.chars();
    let Some(op) = chars.next() else {
        return Err(CmeError::NotSupported);
    };
    let index = chars.as_str();

    let target = if index.is_empty() {
        None
    } else {
        if op != '1' && op != '2' {
            return Err(CmeError::NotSupported);
        }
        if !state.features.contains(AgFeatures::ENHANCED_CALL_CONTROL) {
            return Err(CmeError::NotSupported);
        }
        let n: usize = index.parse().map_err(|_| CmeError::InvalidIndex)?;
        let call = n
            .checked_sub(1)
            .and_then(|n| state.registry.nth_at(&manager, n))
            .ok_or(CmeError::InvalidIndex)?;
        Some(call.path.clone())
    };

    match op {
        '0' => release_held_or_waiting(state, &manager),
        '1' => release_and_accept(state, &manager, target.as_deref()),
        '2' => hold_and_accept(state, &manager, target.as_deref()),
        '3' => {
            let command = OfonoCommand::CreateMultiparty {
                manager: manager.clone(),
            };
            conference_op(state, &manager, command)
        }
        '4' => {
            let command = OfonoCommand::Transfer {
                manager: manager.clone(),
            };
            conference_op(state, &manager, command)
        }
        _ => {
            debug!("Unknown call hold request {}", command);
            Err(CmeError::NotSupported)
        }
    }?;

    state.registry.mark_all_pending(&manager);
    Ok(())
}

/// `0`: release waiting calls, or held calls if none are waiting
fn release_held_or_waiting(state: &mut AppState, manager: &str) -> CmeResult {
    let mut targets = state.registry.paths_with_status_at(manager, CallStatus::Waiting);
    if targets.is_empty() {
        targets = state.registry.paths_with_status_at(manager, CallStatus::Held);
    }

    for call in targets {
        if let Err(e) = hangup(state, &call, manager) {
            debug!("Release of {} not sent: {}", call, e);
        }
    }
    Ok(())
}

/// `1` / `1<idx>`
fn release_and_accept(state: &mut AppState, manager: &str, target: Option<&str>) -> CmeResult {
    if let Some(call) = target {
        return hangup(state, call, manager);
    }

    if state
        .registry
        .find_by_status_at(manager, CallStatus::Waiting)
        .is_none()
    {
        return control(
            state,
            manager,
            OfonoCommand::ReleaseAndSwap {
                manager: manager.to_string(),
            },
        );
    }

    let active = state
        .registry
        .find_by_status_at(manager, CallStatus::Active)
        .map(|c| c.path.clone());
    let waiting = state
        .registry
        .find_by_status_at(manager, CallStatus::Waiting)
        .map(|c| c.path.clone());
    let (Some(active), Some(waiting)) = (active, waiting) else {
        return Err(CmeError::AgFailure);
    };

    // Answered once the active call has disconnected
    set_waiting_for_answer(state, &waiting, true);
    let result = control_via(
        state,
        OfonoCommand::Hangup { call: active },
        ReplyRoute::ReleaseForWaiting {
            manager: manager.to_string(),
            waiting: waiting.clone(),
        },
    );
    if result.is_err() {
        set_waiting_for_answer(state, &waiting, false);
    }
    result
}

fn set_waiting_for_answer(state: &mut AppState, path: &str, value: bool) {
    if let Some(call) = state.registry.find_mut(path) {
        call.waiting_for_answer = value;
    }
}

/// `2` / `2<idx>`
fn hold_and_accept(state: &mut AppState, manager: &str, target: Option<&str>) -> CmeResult {
    let command = match target {
        Some(call) => OfonoCommand::PrivateChat {
            manager: manager.to_string(),
            call: call.to_string(),
        },
        None if state
            .registry
            .find_by_status_at(manager, CallStatus::Waiting)
            .is_some() =>
        {
            OfonoCommand::HoldAndAnswer {
                manager: manager.to_string(),
            }
        }
        None => OfonoCommand::SwapCalls {
            manager: manager.to_string(),
        },
    };
    control(state, manager, command)
}

/// `3` and `4` need conference support and a held or waiting call
fn conference_op(state: &mut AppState, manager: &str, command: OfonoCommand) -> CmeResult {
    if !state
        .supp_features
        .contains(AgSuppFeatures::CONFERENCE_CALLING)
    {
        return Err(CmeError::NotSupported);
    }

    let has_other = state
        .registry
        .find_by_status_at(manager, CallStatus::Held)
        .is_some()
        || state
            .registry
            .find_by_status_at(manager, CallStatus::Waiting)
            .is_some();
    if !has_other {
        return Err(CmeError::NotAllowed);
    }

    control(state, manager, command)
}

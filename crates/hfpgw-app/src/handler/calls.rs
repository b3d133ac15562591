//! Call creation and finalization side effects

use hfpgw_core::prelude::*;
use hfpgw_core::{Call, CallStatus, HfpEvent, Properties};
use hfpgw_modem::{OfonoCommand, ReplyRoute, SignalMatch};

use super::indicators::refresh_indicators;
use super::{UpdateAction, UpdateResult};
use crate::state::AppState;

/// Register a call reported by `GetCalls` or `CallAdded`.
///
/// Duplicates and malformed property sets are dropped. Indicators are not
/// refreshed here; callers do that once per message.
pub(crate) fn register_call(state: &mut AppState, path: &str, manager: &str, props: &Properties) {
    let call = match state.registry.upsert(path, manager, props) {
        Ok(Some(call)) => call.clone(),
        Ok(None) => return,
        Err(e) => {
            warn!("Dropping call {}: {}", path, e);
            return;
        }
    };

    info!("Call {} added ({})", call.path, call.status);

    if let Err(e) = state.sender.watch(SignalMatch::call_properties(&call.path)) {
        warn!("Failed to watch {}: {}", call.path, e);
    }

    match call.status {
        CallStatus::Dialing | CallStatus::Alerting => {
            if let Some(number) = &call.number {
                state.last_dialed_number = Some(number.clone());
            }
        }
        CallStatus::Incoming => state.emit(HfpEvent::IncomingCall {
            number: call.number.clone().unwrap_or_default(),
            number_type: call.number_type().code(),
            waiting: false,
        }),
        CallStatus::Waiting => state.emit(HfpEvent::CallWaiting {
            number: call.number.clone().unwrap_or_default(),
            number_type: call.number_type().code(),
        }),
        _ => {}
    }
}

/// Remove a call and run its finalization, including the queued answer.
pub(crate) fn remove_call(state: &mut AppState, path: &str) -> UpdateResult {
    let Some(call) = state.registry.remove(path) else {
        debug!("Remove for unknown call {}", path);
        return UpdateResult::none();
    };

    let had_answer_obligation = call.waiting_for_answer;
    let result = finalize_call(state, call);

    if !had_answer_obligation {
        answer_waiting_call(state);
    }

    refresh_indicators(state);
    result
}

/// Side effects of a call leaving the registry
pub(crate) fn finalize_call(state: &mut AppState, call: Call) -> UpdateResult {
    info!("Call {} removed ({})", call.path, call.status);

    if call.status == CallStatus::Incoming {
        state.emit(HfpEvent::CallingStopped);
    }

    if let Err(e) = state.sender.unwatch(SignalMatch::call_properties(&call.path)) {
        warn!("Failed to unwatch {}: {}", call.path, e);
    }

    if call.status == CallStatus::Held {
        UpdateResult::action(UpdateAction::CancelDial { call: call.path })
    } else {
        UpdateResult::none()
    }
}

/// Answer the call queued by `+CHLD=1` once the released call is gone
pub(crate) fn answer_waiting_call(state: &mut AppState) {
    let Some(call) = state.registry.waiting_for_answer() else {
        return;
    };

    debug!("Answering queued call {}", call.path);
    let command = OfonoCommand::Answer {
        call: call.path.clone(),
    };
    let route = ReplyRoute::CallControl {
        manager: call.manager.clone(),
    };
    if let Err(e) = state.sender.issue(command, Some(route)) {
        warn!("Failed to answer queued call: {}", e);
    }
}

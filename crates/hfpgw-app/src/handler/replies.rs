//! Method reply routing
//!
//! Replies are matched to their [`ReplyRoute`] through the request tracker.
//! Replies to unknown, expired or cancelled requests are dropped.

use serde_json::Value;

use hfpgw_core::prelude::*;
use hfpgw_modem::ReplyRoute;

use super::discovery;
use super::indicators::refresh_indicators;
use super::UpdateResult;
use crate::state::AppState;

pub(crate) fn method_return(state: &mut AppState, id: u64, body: &[Value]) -> UpdateResult {
    let Some(route) = state.sender.tracker().complete(id) else {
        trace!("Reply for untracked request {}", id);
        return UpdateResult::none();
    };

    match route {
        ReplyRoute::GetModems => discovery::get_modems_reply(state, body),
        ReplyRoute::NetworkProperties { manager } => {
            discovery::network_properties_reply(state, &manager, body)
        }
        ReplyRoute::GetCalls { manager } => discovery::get_calls_reply(state, &manager, body),
        other => {
            trace!("{:?} accepted", other);
            UpdateResult::none()
        }
    }
}

pub(crate) fn method_error(state: &mut AppState, id: u64, name: &str, message: &str) -> UpdateResult {
    let Some(route) = state.sender.tracker().complete(id) else {
        trace!("Error for untracked request {}: {}", id, name);
        return UpdateResult::none();
    };

    warn!("{:?} failed: {}", route, Error::remote(name, message));
    abandon(state, route);
    UpdateResult::none()
}

/// Undo what a request left behind once it will never succeed.
///
/// Control operations release their manager's pending flags and drop any
/// intent stashed on a call for the reply. Queries keep the cached state.
pub(crate) fn abandon(state: &mut AppState, route: ReplyRoute) {
    let Some(manager) = route.control_manager().map(str::to_string) else {
        return;
    };

    match &route {
        ReplyRoute::HoldForDial { call, .. } => {
            if let Some(call) = state.registry.find_mut(call) {
                if call.hold_dial.take().is_some() {
                    debug!("Discarding dial stashed on {}", call.path);
                }
            }
        }
        ReplyRoute::ReleaseForWaiting { waiting, .. } => {
            if let Some(call) = state.registry.find_mut(waiting) {
                call.waiting_for_answer = false;
            }
        }
        _ => {}
    }

    state.registry.clear_pending_at(&manager);
    refresh_indicators(state);
}

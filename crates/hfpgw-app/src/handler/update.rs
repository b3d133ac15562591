//! Main update function - handles state transitions (TEA pattern)

use hfpgw_core::prelude::*;
use hfpgw_core::CallStatus;
use hfpgw_modem::OfonoCommand;

use super::{call_control, discovery, indicators, replies, signals, UpdateResult};
use crate::message::Message;
use crate::state::{AppState, GatewayPhase};

/// Process a message and update state
/// Returns the actions for the engine to perform
pub fn update(state: &mut AppState, message: Message) -> UpdateResult {
    // Keep-alive hook
    trace!("keep-alive");

    match message {
        Message::ServiceAppeared => discovery::service_appeared(state),

        Message::ServiceVanished => discovery::service_vanished(state),

        Message::Signal(signal) => signals::handle_signal(state, signal),

        Message::MethodReturn { id, body } => replies::method_return(state, id, &body),

        Message::MethodError { id, name, message } => {
            replies::method_error(state, id, &name, &message)
        }

        Message::Hfp(request) => call_control::handle_request(state, request),

        Message::BatteryLevel { percent } => {
            indicators::set_battery_level(state, percent);
            UpdateResult::none()
        }

        Message::DeferredDial {
            call,
            manager,
            dial,
        } => {
            if !state.is_active_manager(&manager) {
                debug!("Dropping deferred dial: {} is no longer active", manager);
                return UpdateResult::none();
            }

            let still_held = state
                .registry
                .find(&call)
                .is_some_and(|c| c.status == CallStatus::Held);
            if !still_held {
                debug!("Dropping deferred dial: {} is no longer held", call);
                return UpdateResult::none();
            }

            info!("Placing deferred dial on {}", manager);
            let command = OfonoCommand::Dial {
                manager: manager.clone(),
                number: dial.number,
                clir: dial.clir,
            };
            if let Err(e) = state.sender.send_fire_and_forget(command) {
                warn!("Deferred dial failed: {}", e);
            }
            UpdateResult::none()
        }

        Message::Tick => {
            let timeout = state.settings.requests.timeout();
            let expired = state.sender.tracker().cleanup_stale(timeout);
            if !expired.is_empty() {
                warn!("{} requests expired without a reply", expired.len());
            }
            for route in expired {
                replies::abandon(state, route);
            }
            UpdateResult::none()
        }

        Message::Quit => {
            state.phase = GatewayPhase::Quitting;
            UpdateResult::none()
        }
    }
}

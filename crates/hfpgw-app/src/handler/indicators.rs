//! Indicator derivation
//!
//! Re-derives every AG indicator from the registry and network state after
//! each mutation. `call` and `callheld` are left untouched while any call
//! has a control operation in flight, so one consolidated update follows
//! once every pending call has reported its final state.

use hfpgw_core::prelude::*;
use hfpgw_core::{
    battchg_from_percent, CallHeld, CallIndicator, CallSetup, HfpEvent, IndicatorKind,
};

use crate::state::AppState;

pub(crate) fn refresh_indicators(state: &mut AppState) {
    let service = u8::from(state.network.has_service());
    let roam = u8::from(state.network.is_roaming());
    let signal = state.network.signal_bars();
    let callsetup = CallSetup::find(state.registry.statuses()) as u8;

    update_indicator(state, IndicatorKind::Service, service);
    update_indicator(state, IndicatorKind::Roam, roam);
    update_indicator(state, IndicatorKind::Signal, signal);
    update_indicator(state, IndicatorKind::Callsetup, callsetup);

    if state.registry.any_pending() {
        trace!("Call statuses pending, call/callheld not derived");
        return;
    }

    let call = CallIndicator::find(state.registry.statuses()) as u8;
    let callheld = CallHeld::find(state.registry.statuses()) as u8;
    update_indicator(state, IndicatorKind::Call, call);
    update_indicator(state, IndicatorKind::Callheld, callheld);
}

/// Convert a charge percentage and update `battchg`
pub(crate) fn set_battery_level(state: &mut AppState, percent: u8) {
    update_indicator(state, IndicatorKind::Battchg, battchg_from_percent(percent));
}

/// Store `value` and report it to the HF if it changed and reporting is on
pub(crate) fn update_indicator(state: &mut AppState, kind: IndicatorKind, value: u8) {
    if !state.indicators.set(kind, value) {
        return;
    }

    let value = state.indicators.get(kind);
    debug!("Indicator {} = {}", kind, value);

    if state.events_enabled && state.indicators.is_enabled(kind) {
        state.emit(HfpEvent::indicator(kind.name(), value));
    }
}

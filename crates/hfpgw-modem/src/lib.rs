//! # hfpgw-modem - oFono Bridge Plumbing
//!
//! Issues oFono method calls over the NDJSON bridge, correlates their replies,
//! and decodes the service's signals.
//!
//! Depends on [`hfpgw_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Requests
//! - [`CommandSender`] - Issue oFono calls, signal subscriptions and HFP events
//! - [`RequestTracker`] - Track pending request/reply pairs
//! - [`OfonoCommand`] - The oFono methods hfpgw calls
//! - [`ReplyRoute`] - Continuation selected when a reply arrives
//!
//! ### Protocol
//! - [`parse_inbound()`] - Parse one bridge line
//! - [`decode_signal()`] - Turn a bus signal into an [`OfonoSignal`](hfpgw_core::OfonoSignal)
//! - [`parse_object_list()`], [`parse_properties()`] - Decode reply bodies

pub mod commands;
pub mod protocol;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use commands::{next_request_id, CommandSender, OfonoCommand, ReplyRoute, RequestTracker};
pub use protocol::{
    decode_signal, parse_inbound, parse_object_list, parse_properties, InboundFrame,
    OutboundFrame, SignalMatch,
};

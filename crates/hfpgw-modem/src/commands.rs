//! oFono method calls and request tracking
//!
//! This module provides:
//! - Request ID allocation shared by every bridge call
//! - Command building for the oFono D-Bus API
//! - Reply routing for requests that expect a continuation
//! - Expiry of requests the service never answers

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use hfpgw_core::prelude::*;
use hfpgw_core::{ClirMode, HfpEvent};

use crate::protocol::{OutboundFrame, SignalMatch};

pub const OFONO_BUS: &str = "org.ofono";
pub const OFONO_PATH: &str = "/";
pub const OFONO_MANAGER_INTERFACE: &str = "org.ofono.Manager";
pub const OFONO_MODEM_INTERFACE: &str = "org.ofono.Modem";
pub const OFONO_NETWORKREG_INTERFACE: &str = "org.ofono.NetworkRegistration";
pub const OFONO_VCMANAGER_INTERFACE: &str = "org.ofono.VoiceCallManager";
pub const OFONO_VC_INTERFACE: &str = "org.ofono.VoiceCall";

/// Global request ID counter
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID
pub fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// What to do with the reply to a tracked request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyRoute {
    /// `Manager.GetModems`: offer each modem for activation
    GetModems,
    /// `NetworkRegistration.GetProperties`: seed network state, then list calls
    NetworkProperties { manager: String },
    /// `VoiceCallManager.GetCalls`: register every listed call
    GetCalls { manager: String },
    /// A call-control operation; an error reply clears the manager's pending flags
    CallControl { manager: String },
    /// `SwapCalls` putting `call` on hold ahead of a dial. An error also
    /// discards the dial stashed on `call`.
    HoldForDial { manager: String, call: String },
    /// `Hangup` of the active call so `waiting` can be answered. An error
    /// also clears the answer-on-disconnect flag of `waiting`.
    ReleaseForWaiting { manager: String, waiting: String },
}

impl ReplyRoute {
    /// Manager whose pending flags a control operation holds
    pub fn control_manager(&self) -> Option<&str> {
        match self {
            ReplyRoute::CallControl { manager }
            | ReplyRoute::HoldForDial { manager, .. }
            | ReplyRoute::ReleaseForWaiting { manager, .. } => Some(manager),
            _ => None,
        }
    }
}

/// A pending request awaiting its reply
#[derive(Debug)]
struct PendingRequest {
    route: ReplyRoute,
    /// When this request was created
    created_at: Instant,
    /// Description for logging
    description: &'static str,
}

/// Tracks requests whose replies need routing
#[derive(Debug, Default)]
pub struct RequestTracker {
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, PendingRequest>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new pending request, returning its id
    pub fn register(&self, route: ReplyRoute, description: &'static str) -> u64 {
        let id = next_request_id();
        self.lock().insert(
            id,
            PendingRequest {
                route,
                created_at: Instant::now(),
                description,
            },
        );
        id
    }

    /// Match a reply to its pending request.
    ///
    /// Returns `None` for unknown, expired or cancelled ids.
    pub fn complete(&self, id: u64) -> Option<ReplyRoute> {
        self.lock().remove(&id).map(|req| {
            trace!(
                "Request #{} ({}) completed after {:?}",
                id,
                req.description,
                req.created_at.elapsed()
            );
            req.route
        })
    }

    /// Drop a registration whose request never left
    pub fn forget(&self, id: u64) {
        self.lock().remove(&id);
    }

    /// Cancel all pending requests (e.g., on shutdown)
    pub fn cancel_all(&self) -> usize {
        let mut pending = self.lock();
        let count = pending.len();
        for (id, req) in pending.drain() {
            debug!("Cancelled request #{} ({})", id, req.description);
        }
        count
    }

    /// Remove requests that have gone unanswered for longer than `timeout`.
    ///
    /// Returns the routes of the expired requests so their callers can undo
    /// whatever they were waiting on.
    pub fn cleanup_stale(&self, timeout: Duration) -> Vec<ReplyRoute> {
        let mut pending = self.lock();
        let now = Instant::now();

        let stale: Vec<u64> = pending
            .iter()
            .filter(|(_, req)| now.duration_since(req.created_at) > timeout)
            .map(|(id, _)| *id)
            .collect();

        stale
            .into_iter()
            .filter_map(|id| {
                let req = pending.remove(&id)?;
                warn!("Request #{} ({}) timed out", id, req.description);
                Some(req.route)
            })
            .collect()
    }

    /// Get the number of pending requests
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}

/// oFono method calls issued by hfpgw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfonoCommand {
    GetModems,
    GetNetworkProperties { modem: String },
    GetCalls { manager: String },
    Dial {
        manager: String,
        number: String,
        clir: ClirMode,
    },
    SendTones { manager: String, tones: String },
    ReleaseAndSwap { manager: String },
    HoldAndAnswer { manager: String },
    /// Split `call` out of a multiparty call
    PrivateChat { manager: String, call: String },
    SwapCalls { manager: String },
    CreateMultiparty { manager: String },
    HangupMultiparty { manager: String },
    Transfer { manager: String },
    Answer { call: String },
    Hangup { call: String },
}

impl OfonoCommand {
    /// Build the bridge frame for this call
    pub fn build(&self, id: u64) -> OutboundFrame {
        let (path, interface, method, args): (&str, &str, &str, Vec<Value>) = match self {
            OfonoCommand::GetModems => (OFONO_PATH, OFONO_MANAGER_INTERFACE, "GetModems", vec![]),
            OfonoCommand::GetNetworkProperties { modem } => {
                (modem.as_str(), OFONO_NETWORKREG_INTERFACE, "GetProperties", vec![])
            }
            OfonoCommand::GetCalls { manager } => {
                (manager.as_str(), OFONO_VCMANAGER_INTERFACE, "GetCalls", vec![])
            }
            OfonoCommand::Dial {
                manager,
                number,
                clir,
            } => (
                manager.as_str(),
                OFONO_VCMANAGER_INTERFACE,
                "Dial",
                vec![json!(number), json!(clir.as_str())],
            ),
            OfonoCommand::SendTones { manager, tones } => (
                manager.as_str(),
                OFONO_VCMANAGER_INTERFACE,
                "SendTones",
                vec![json!(tones)],
            ),
            OfonoCommand::ReleaseAndSwap { manager } => {
                (manager.as_str(), OFONO_VCMANAGER_INTERFACE, "ReleaseAndSwap", vec![])
            }
            OfonoCommand::HoldAndAnswer { manager } => {
                (manager.as_str(), OFONO_VCMANAGER_INTERFACE, "HoldAndAnswer", vec![])
            }
            OfonoCommand::PrivateChat { manager, call } => (
                manager.as_str(),
                OFONO_VCMANAGER_INTERFACE,
                "PrivateChat",
                vec![json!(call)],
            ),
            OfonoCommand::SwapCalls { manager } => {
                (manager.as_str(), OFONO_VCMANAGER_INTERFACE, "SwapCalls", vec![])
            }
            OfonoCommand::CreateMultiparty { manager } => {
                (manager.as_str(), OFONO_VCMANAGER_INTERFACE, "CreateMultiparty", vec![])
            }
            OfonoCommand::HangupMultiparty { manager } => {
                (manager.as_str(), OFONO_VCMANAGER_INTERFACE, "HangupMultiparty", vec![])
            }
            OfonoCommand::Transfer { manager } => {
                (manager.as_str(), OFONO_VCMANAGER_INTERFACE, "Transfer", vec![])
            }
            OfonoCommand::Answer { call } => (call.as_str(), OFONO_VC_INTERFACE, "Answer", vec![]),
            OfonoCommand::Hangup { call } => (call.as_str(), OFONO_VC_INTERFACE, "Hangup", vec![]),
        };

        OutboundFrame::Call {
            id,
            destination: OFONO_BUS.to_string(),
            path: path.to_string(),
            interface: interface.to_string(),
            method: method.to_string(),
            args,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            OfonoCommand::GetModems => "get modems",
            OfonoCommand::GetNetworkProperties { .. } => "get network properties",
            OfonoCommand::GetCalls { .. } => "get calls",
            OfonoCommand::Dial { .. } => "dial",
            OfonoCommand::SendTones { .. } => "send tones",
            OfonoCommand::ReleaseAndSwap { .. } => "release and swap",
            OfonoCommand::HoldAndAnswer { .. } => "hold and answer",
            OfonoCommand::PrivateChat { .. } => "private chat",
            OfonoCommand::SwapCalls { .. } => "swap calls",
            OfonoCommand::CreateMultiparty { .. } => "create multiparty",
            OfonoCommand::HangupMultiparty { .. } => "hangup multiparty",
            OfonoCommand::Transfer { .. } => "transfer",
            OfonoCommand::Answer { .. } => "answer",
            OfonoCommand::Hangup { .. } => "hangup",
        }
    }
}

/// Sends frames to the bridge with request tracking
///
/// Never blocks: a full or closed bridge channel is reported as a transport
/// error to the caller.
#[derive(Clone)]
pub struct CommandSender {
    /// Channel to the bridge writer
    frame_tx: mpsc::Sender<OutboundFrame>,
    /// Request tracker for reply routing
    tracker: Arc<RequestTracker>,
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("frame_tx", &"<channel>")
            .field("tracker", &"<tracker>")
            .finish()
    }
}

impl CommandSender {
    pub fn new(frame_tx: mpsc::Sender<OutboundFrame>, tracker: Arc<RequestTracker>) -> Self {
        Self { frame_tx, tracker }
    }

    /// Issue a method call.
    ///
    /// With a route the reply is tracked and comes back through
    /// [`RequestTracker::complete`]; without one the call is fire-and-forget.
    pub fn issue(&self, command: OfonoCommand, route: Option<ReplyRoute>) -> Result<u64> {
        let tracked = route.is_some();
        let id = match route {
            Some(route) => self.tracker.register(route, command.description()),
            None => next_request_id(),
        };

        debug!("Sending request #{}: {}", id, command.description());

        if let Err(e) = self.push(command.build(id)) {
            if tracked {
                self.tracker.forget(id);
            }
            return Err(e);
        }
        Ok(id)
    }

    /// Send a fire-and-forget call (no reply expected)
    pub fn send_fire_and_forget(&self, command: OfonoCommand) -> Result<u64> {
        self.issue(command, None)
    }

    /// Subscribe to a signal
    pub fn watch(&self, rule: SignalMatch) -> Result<()> {
        self.push(OutboundFrame::AddMatch { rule })
    }

    /// Drop a signal subscription
    pub fn unwatch(&self, rule: SignalMatch) -> Result<()> {
        self.push(OutboundFrame::RemoveMatch { rule })
    }

    /// Relay an event to the HFP layer
    pub fn emit(&self, event: HfpEvent) -> Result<()> {
        self.push(OutboundFrame::Hfp { event })
    }

    fn push(&self, frame: OutboundFrame) -> Result<()> {
        self.frame_tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => Error::transport("bridge channel full"),
            TrySendError::Closed(_) => Error::ChannelClosed,
        })
    }

    /// Get the request tracker (for reply handling)
    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }
}

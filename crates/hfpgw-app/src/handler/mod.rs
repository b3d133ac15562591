//! Handler module - TEA update function and event handlers
//!
//! Organized into submodules:
//! - `update`: Main update() function and message dispatch
//! - `signals`: oFono signal handling (call and network property changes)
//! - `calls`: Call creation and finalization side effects
//! - `discovery`: Modem discovery and teardown
//! - `replies`: Routing of method returns and errors
//! - `call_control`: HFP requests and the `+CHLD` state machine
//! - `indicators`: Indicator derivation

pub(crate) mod call_control;
pub(crate) mod calls;
pub(crate) mod discovery;
pub(crate) mod indicators;
pub(crate) mod replies;
pub(crate) mod signals;
pub(crate) mod update;


use std::time::Duration;

use hfpgw_core::PendingDial;

// Re-export main entry point
pub use update::update;

/// Actions that the engine should perform after update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateAction {
    /// Feed `Message::DeferredDial` back after `delay`
    ScheduleDial {
        call: String,
        manager: String,
        dial: PendingDial,
        delay: Duration,
    },

    /// Drop the scheduled dial tied to `call`, if any
    CancelDial { call: String },
}

/// Result of processing a message
#[derive(Debug, Default)]
pub struct UpdateResult {
    /// Actions for the engine to perform, in order
    pub actions: Vec<UpdateAction>,
}

impl UpdateResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn action(action: UpdateAction) -> Self {
        Self {
            actions: vec![action],
        }
    }

    pub fn merge(&mut self, other: UpdateResult) {
        self.actions.extend(other.actions);
    }
}

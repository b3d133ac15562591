//! hfpgw-app - Call-state synchronization and HFP call control
//!
//! This crate implements the TEA (The Elm Architecture) pattern for the
//! gateway: a single [`AppState`] mutated by [`handler::update`] in response
//! to [`Message`]s, with the [`Engine`] owning the message loop, deferred
//! dial timers and background pollers.

pub mod actions;
pub mod config;
pub mod engine;
pub mod handler;
pub mod message;
pub mod registry;
pub mod state;

// Re-export primary types
pub use config::Settings;
pub use engine::Engine;
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use registry::CallRegistry;
pub use state::{AppState, GatewayPhase};

//! # hfpgw-core - Core Telephony Types
//!
//! Foundation crate for hfpgw. Provides the call and network domain types,
//! the HFP indicator table and feature masks, the events exchanged with the
//! HFP layer, error handling, and logging setup.
//!
//! This crate has **zero internal dependencies**.
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`Call`] - One call tracked by the registry
//! - [`CallStatus`], [`CallDirection`] - Call state as reported by oFono
//! - [`ClirMode`], [`PendingDial`] - Dial parameters
//! - [`NetworkState`], [`ModemState`] - Registration and modem presence
//!
//! ### Indicators (`indicators`)
//! - [`IndicatorTable`] - Last reported value of each AG indicator
//! - [`CallIndicator`], [`CallSetup`], [`CallHeld`] - Values derived from call statuses
//! - [`AgFeatures`], [`AgSuppFeatures`] - Feature masks
//!
//! ### Events (`events`)
//! - [`HfpRequest`] / [`HfpEvent`] - Traffic with the HFP layer
//! - [`OfonoSignal`] - Decoded oFono notifications
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Infrastructure errors, with `is_fatal` marking the ones that stop the gateway
//! - [`CmeError`] - HFP extended error result codes
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! ```rust
//! use hfpgw_core::prelude::*;
//! ```

pub mod error;
pub mod events;
pub mod indicators;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all hfpgw crates
pub mod prelude {
    pub use super::error::{CmeError, Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{CmeError, Error, Result, ResultExt};
pub use events::{HfpEvent, HfpRequest, HfpRequestKind, OfonoSignal};
pub use indicators::{
    battchg_from_percent, chld_capabilities, AgFeatures, AgSuppFeatures, CallHeld,
    CallIndicator, CallSetup, Indicator, IndicatorInfo, IndicatorKind, IndicatorTable,
};
pub use types::{
    Call, CallDirection, CallStatus, ClirMode, ModemState, NetworkState, NumberType, PendingDial,
    Properties, RegistrationStatus,
};

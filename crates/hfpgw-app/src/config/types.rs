//! Configuration types for hfpgw
//!
//! Defines `Settings` and its per-section sub-types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Global gateway settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub features: FeatureSettings,

    #[serde(default)]
    pub battery: BatterySettings,

    #[serde(default)]
    pub dial: DialSettings,

    #[serde(default)]
    pub requests: RequestSettings,
}

/// Feature masks removed from the advertised AG features
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeatureSettings {
    /// `+BRSF` bits to disable
    #[serde(default)]
    pub disabled: u32,

    /// Supplementary bits to disable (conference calling)
    #[serde(default)]
    pub disabled_supplementary: u32,
}

/// Where battery charge readings come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatterySource {
    /// `battery` frames sent by the bridge
    #[default]
    Bridge,
    /// A statefs charge-percentage file polled on an interval
    Statefs,
    /// `battchg` stays at its initial value
    None,
}

/// Battery indicator settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BatterySettings {
    #[serde(default)]
    pub source: BatterySource,

    /// Charge percentage file, used with the statefs source
    #[serde(default = "default_battery_path")]
    pub path: PathBuf,

    /// Poll interval in milliseconds for the statefs source
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BatterySettings {
    fn default() -> Self {
        Self {
            source: BatterySource::default(),
            path: default_battery_path(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl BatterySettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }
}

fn default_battery_path() -> PathBuf {
    PathBuf::from("/run/state/namespaces/Battery/ChargePercentage")
}

fn default_poll_interval_ms() -> u64 {
    30_000
}

/// Dialing settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DialSettings {
    /// File holding the number to redial; the last observed dial is used when unset
    #[serde(default)]
    pub last_number_path: Option<PathBuf>,

    /// Delay between a call reaching Held and the stashed dial being placed
    #[serde(default = "default_hold_dial_delay_ms")]
    pub hold_dial_delay_ms: u64,
}

impl Default for DialSettings {
    fn default() -> Self {
        Self {
            last_number_path: None,
            hold_dial_delay_ms: default_hold_dial_delay_ms(),
        }
    }
}

impl DialSettings {
    pub fn hold_dial_delay(&self) -> Duration {
        Duration::from_millis(self.hold_dial_delay_ms)
    }
}

fn default_hold_dial_delay_ms() -> u64 {
    1_000
}

/// oFono request settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RequestSettings {
    /// Replies older than this are given up on
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RequestSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

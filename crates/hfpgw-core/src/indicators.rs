//! HFP AG indicators and feature masks
//!
//! The [`IndicatorTable`] holds the last value reported for each of the
//! seven AG indicators, in the order they are announced to the HF. The
//! call-derived indicator values ([`CallIndicator`], [`CallSetup`],
//! [`CallHeld`]) are computed from the statuses of every known call.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::types::CallStatus;

// ─────────────────────────────────────────────────────────
// Indicator table
// ─────────────────────────────────────────────────────────

/// The AG indicators, in `+CIND` announcement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Battchg,
    Signal,
    Service,
    Call,
    Callsetup,
    Callheld,
    Roam,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::Battchg,
        IndicatorKind::Signal,
        IndicatorKind::Service,
        IndicatorKind::Call,
        IndicatorKind::Callsetup,
        IndicatorKind::Callheld,
        IndicatorKind::Roam,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Battchg => "battchg",
            IndicatorKind::Signal => "signal",
            IndicatorKind::Service => "service",
            IndicatorKind::Call => "call",
            IndicatorKind::Callsetup => "callsetup",
            IndicatorKind::Callheld => "callheld",
            IndicatorKind::Roam => "roam",
        }
    }

    /// Highest valid value. The lowest is always 0.
    pub fn max(&self) -> u8 {
        match self {
            IndicatorKind::Battchg | IndicatorKind::Signal => 5,
            IndicatorKind::Callsetup => 3,
            IndicatorKind::Callheld => 2,
            IndicatorKind::Service | IndicatorKind::Call | IndicatorKind::Roam => 1,
        }
    }

    fn initial_value(&self) -> u8 {
        match self {
            IndicatorKind::Battchg => 5,
            _ => 0,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the indicator table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub kind: IndicatorKind,
    pub value: u8,
    /// Whether unsolicited updates are reported for this indicator
    pub enabled: bool,
}

/// Indicator description announced in the `Ready` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorInfo {
    pub name: String,
    pub min: u8,
    pub max: u8,
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorTable {
    entries: [Indicator; 7],
}

impl Default for IndicatorTable {
    fn default() -> Self {
        Self {
            entries: IndicatorKind::ALL.map(|kind| Indicator {
                kind,
                value: kind.initial_value(),
                enabled: true,
            }),
        }
    }
}

impl IndicatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: IndicatorKind) -> u8 {
        self.entries[kind.index()].value
    }

    /// Store a new value, clamped to the indicator's range.
    ///
    /// Returns `true` if the stored value changed.
    pub fn set(&mut self, kind: IndicatorKind, value: u8) -> bool {
        let value = value.min(kind.max());
        let entry = &mut self.entries[kind.index()];
        if entry.value == value {
            return false;
        }
        entry.value = value;
        true
    }

    pub fn is_enabled(&self, kind: IndicatorKind) -> bool {
        self.entries[kind.index()].enabled
    }

    pub fn set_enabled(&mut self, kind: IndicatorKind, enabled: bool) {
        self.entries[kind.index()].enabled = enabled;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Indicator> {
        self.entries.iter()
    }

    /// Snapshot of the table for the `Ready` announcement
    pub fn describe(&self) -> Vec<IndicatorInfo> {
        self.entries
            .iter()
            .map(|entry| IndicatorInfo {
                name: entry.kind.name().to_string(),
                min: 0,
                max: entry.kind.max(),
                value: entry.value,
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────
// Call-derived indicator values
// ─────────────────────────────────────────────────────────

/// The `call` indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallIndicator {
    /// No call is active or held
    #[default]
    Inactive = 0,
    Active = 1,
}

impl CallIndicator {
    pub fn find(mut iter: impl Iterator<Item = CallStatus>) -> Self {
        if iter.any(|status| matches!(status, CallStatus::Active | CallStatus::Held)) {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

/// The `callsetup` indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallSetup {
    #[default]
    Inactive = 0,
    Incoming = 1,
    Outgoing = 2,
    Alerting = 3,
}

impl CallSetup {
    /// Ringing-in takes priority over dialing, which takes priority over
    /// ringing-out.
    pub fn find(iter: impl Iterator<Item = CallStatus>) -> Self {
        iter.fold(Self::Inactive, |acc, status| {
            let candidate = match status {
                CallStatus::Incoming | CallStatus::Waiting => Self::Incoming,
                CallStatus::Dialing => Self::Outgoing,
                CallStatus::Alerting => Self::Alerting,
                _ => Self::Inactive,
            };
            if candidate.priority() > acc.priority() {
                candidate
            } else {
                acc
            }
        })
    }

    fn priority(&self) -> u8 {
        match self {
            CallSetup::Inactive => 0,
            CallSetup::Alerting => 1,
            CallSetup::Outgoing => 2,
            CallSetup::Incoming => 3,
        }
    }
}

/// The `callheld` indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallHeld {
    #[default]
    None = 0,
    /// A held call and a non-held call exist together
    MultipleHeld = 1,
    /// Only held calls exist
    OnHold = 2,
}

impl CallHeld {
    pub fn find(iter: impl Iterator<Item = CallStatus>) -> Self {
        let (held, other) = iter.fold((false, false), |(held, other), status| {
            if status == CallStatus::Held {
                (true, other)
            } else {
                (held, true)
            }
        });
        match (held, other) {
            (false, _) => Self::None,
            (true, true) => Self::MultipleHeld,
            (true, false) => Self::OnHold,
        }
    }
}

/// Convert a battery charge percentage into the 0-5 `battchg` scale.
pub fn battchg_from_percent(percent: u8) -> u8 {
    let scaled = 5 * (u32::from(percent) + 10) / 100;
    scaled.min(5) as u8
}

// ─────────────────────────────────────────────────────────
// Feature masks
// ─────────────────────────────────────────────────────────

bitflags! {
    /// HFP AG supported features (`+BRSF`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AgFeatures: u32 {
        const THREE_WAY_CALLING = 0x0001;
        const EC_ANDOR_NR = 0x0002;
        const VOICE_RECOGNITION = 0x0004;
        const INBAND_RINGTONE = 0x0008;
        const ATTACH_NUMBER_TO_VOICETAG = 0x0010;
        const REJECT_A_CALL = 0x0020;
        const ENHANCED_CALL_STATUS = 0x0040;
        const ENHANCED_CALL_CONTROL = 0x0080;
        const EXTENDED_ERROR_RESULT_CODES = 0x0100;
    }
}

impl AgFeatures {
    /// Features offered when nothing is disabled by configuration
    pub const DEFAULT: AgFeatures = AgFeatures::EC_ANDOR_NR
        .union(AgFeatures::INBAND_RINGTONE)
        .union(AgFeatures::REJECT_A_CALL)
        .union(AgFeatures::ENHANCED_CALL_STATUS)
        .union(AgFeatures::ENHANCED_CALL_CONTROL)
        .union(AgFeatures::EXTENDED_ERROR_RESULT_CODES)
        .union(AgFeatures::THREE_WAY_CALLING);

    /// Default features minus the bits of a configured disable mask
    pub fn with_disabled(mask: u32) -> Self {
        Self::DEFAULT.difference(Self::from_bits_truncate(mask))
    }
}

bitflags! {
    /// Supplementary AG features not covered by `+BRSF`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AgSuppFeatures: u32 {
        const CONFERENCE_CALLING = 0x0001;
    }
}

impl AgSuppFeatures {
    pub const DEFAULT: AgSuppFeatures = AgSuppFeatures::CONFERENCE_CALLING;

    pub fn with_disabled(mask: u32) -> Self {
        Self::DEFAULT.difference(Self::from_bits_truncate(mask))
    }
}

/// `+CHLD=?` capability string for the given feature masks
pub fn chld_capabilities(features: AgFeatures, supp: AgSuppFeatures) -> &'static str {
    let enhanced = features.contains(AgFeatures::ENHANCED_CALL_CONTROL);
    let conference = supp.contains(AgSuppFeatures::CONFERENCE_CALLING);
    match (enhanced, conference) {
        (false, false) => "0,1,2",
        (true, false) => "0,1,1x,2,2x",
        (false, true) => "0,1,2,3,4",
        (true, true) => "0,1,1x,2,2x,3,4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_and_defaults() {
        let table = IndicatorTable::new();
        let names: Vec<_> = table.iter().map(|i| i.kind.name()).collect();
        assert_eq!(
            names,
            vec!["battchg", "signal", "service", "call", "callsetup", "callheld", "roam"]
        );
        assert_eq!(table.get(IndicatorKind::Battchg), 5);
        assert_eq!(table.get(IndicatorKind::Callheld), 0);
        assert!(table.iter().all(|i| i.enabled));
    }

    #[test]
    fn test_set_reports_change_only() {
        let mut table = IndicatorTable::new();
        assert!(table.set(IndicatorKind::Call, 1));
        assert!(!table.set(IndicatorKind::Call, 1));
        assert!(table.set(IndicatorKind::Call, 0));
    }

    #[test]
    fn test_set_clamps_to_range() {
        let mut table = IndicatorTable::new();
        table.set(IndicatorKind::Callheld, 9);
        assert_eq!(table.get(IndicatorKind::Callheld), 2);
    }

    #[test]
    fn test_describe_ranges() {
        let info = IndicatorTable::new().describe();
        assert_eq!(info.len(), 7);
        assert_eq!(info[4].name, "callsetup");
        assert_eq!(info[4].max, 3);
        assert_eq!(info[0].value, 5);
    }

    #[test]
    fn test_call_indicator_find() {
        use CallStatus::*;
        assert_eq!(CallIndicator::find([].into_iter()), CallIndicator::Inactive);
        assert_eq!(
            CallIndicator::find([Incoming, Dialing].into_iter()),
            CallIndicator::Inactive
        );
        assert_eq!(CallIndicator::find([Held].into_iter()), CallIndicator::Active);
    }

    #[test]
    fn test_callsetup_priority() {
        use CallStatus::*;
        assert_eq!(CallSetup::find([Active].into_iter()), CallSetup::Inactive);
        assert_eq!(
            CallSetup::find([Alerting, Dialing].into_iter()),
            CallSetup::Outgoing
        );
        assert_eq!(
            CallSetup::find([Alerting, Active, Waiting].into_iter()),
            CallSetup::Incoming
        );
        assert_eq!(CallSetup::find([Alerting].into_iter()), CallSetup::Alerting);
    }

    #[test]
    fn test_callheld_find() {
        use CallStatus::*;
        assert_eq!(CallHeld::find([].into_iter()), CallHeld::None);
        assert_eq!(CallHeld::find([Active].into_iter()), CallHeld::None);
        assert_eq!(CallHeld::find([Held].into_iter()), CallHeld::OnHold);
        assert_eq!(CallHeld::find([Held, Held].into_iter()), CallHeld::OnHold);
        assert_eq!(
            CallHeld::find([Held, Active].into_iter()),
            CallHeld::MultipleHeld
        );
        assert_eq!(
            CallHeld::find([Waiting, Held].into_iter()),
            CallHeld::MultipleHeld
        );
    }

    #[test]
    fn test_battchg_conversion() {
        assert_eq!(battchg_from_percent(0), 0);
        assert_eq!(battchg_from_percent(10), 1);
        assert_eq!(battchg_from_percent(50), 3);
        assert_eq!(battchg_from_percent(90), 5);
        assert_eq!(battchg_from_percent(100), 5);
        assert_eq!(battchg_from_percent(255), 5);
    }

    #[test]
    fn test_default_features() {
        let features = AgFeatures::DEFAULT;
        assert!(features.contains(AgFeatures::THREE_WAY_CALLING));
        assert!(!features.contains(AgFeatures::VOICE_RECOGNITION));
        assert_eq!(features.bits(), 0x01EB);
    }

    #[test]
    fn test_disabled_mask() {
        let features = AgFeatures::with_disabled(AgFeatures::THREE_WAY_CALLING.bits());
        assert!(!features.contains(AgFeatures::THREE_WAY_CALLING));
        assert!(features.contains(AgFeatures::REJECT_A_CALL));
        assert!(AgSuppFeatures::with_disabled(1).is_empty());
    }

    #[test]
    fn test_chld_capabilities() {
        let supp = AgSuppFeatures::DEFAULT;
        assert_eq!(
            chld_capabilities(AgFeatures::DEFAULT, supp),
            "0,1,1x,2,2x,3,4"
        );
        assert_eq!(
            chld_capabilities(AgFeatures::DEFAULT, AgSuppFeatures::empty()),
            "0,1,1x,2,2x"
        );
        let basic = AgFeatures::with_disabled(AgFeatures::ENHANCED_CALL_CONTROL.bits());
        assert_eq!(chld_capabilities(basic, supp), "0,1,2,3,4");
        assert_eq!(chld_capabilities(basic, AgSuppFeatures::empty()), "0,1,2");
    }
}

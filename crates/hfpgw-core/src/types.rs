//! Telephony domain types shared by all hfpgw crates

use serde::{Deserialize, Serialize};

/// D-Bus `a{sv}` property dictionary as carried over the bridge.
pub type Properties = serde_json::Map<String, serde_json::Value>;

// ─────────────────────────────────────────────────────────
// Call
// ─────────────────────────────────────────────────────────

/// Call status as reported by `org.ofono.VoiceCall.State`.
///
/// Discriminants match the `+CLCC` `<stat>` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    #[default]
    Active = 0,
    Held = 1,
    Dialing = 2,
    Alerting = 3,
    Incoming = 4,
    Waiting = 5,
    Disconnected = 6,
}

impl CallStatus {
    /// Parse an oFono `State` string
    pub fn from_ofono(state: &str) -> Option<Self> {
        match state {
            "active" => Some(Self::Active),
            "held" => Some(Self::Held),
            "dialing" => Some(Self::Dialing),
            "alerting" => Some(Self::Alerting),
            "incoming" => Some(Self::Incoming),
            "waiting" => Some(Self::Waiting),
            "disconnected" => Some(Self::Disconnected),
            _ => None,
        }
    }

    /// `+CLCC` status code
    pub fn clcc_code(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CallStatus::Active => "active",
            CallStatus::Held => "held",
            CallStatus::Dialing => "dialing",
            CallStatus::Alerting => "alerting",
            CallStatus::Incoming => "incoming",
            CallStatus::Waiting => "waiting",
            CallStatus::Disconnected => "disconnected",
        };
        write!(f, "{}", s)
    }
}

/// The direction of call initiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    /// Placed from this AG (outgoing)
    Originating,
    /// Received by this AG (incoming)
    #[default]
    Terminating,
}

impl CallDirection {
    /// `+CLCC` `<dir>` code
    pub fn clcc_code(&self) -> u8 {
        match self {
            CallDirection::Originating => 0,
            CallDirection::Terminating => 1,
        }
    }
}

/// Calling Line Identification Restriction mode passed to `Dial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClirMode {
    #[default]
    Default,
    Enabled,
    Disabled,
}

impl ClirMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClirMode::Default => "default",
            ClirMode::Enabled => "enabled",
            ClirMode::Disabled => "disabled",
        }
    }

    /// Strip a `*31#` / `#31#` prefix from a dial string.
    ///
    /// Returns the remaining number and the CLIR mode it selects.
    pub fn split_prefix(number: &str) -> (&str, ClirMode) {
        if let Some(rest) = number.strip_prefix("*31#") {
            (rest, ClirMode::Enabled)
        } else if let Some(rest) = number.strip_prefix("#31#") {
            (rest, ClirMode::Disabled)
        } else {
            (number, ClirMode::Default)
        }
    }
}

/// A dial stashed on an active call while it is being put on hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDial {
    pub number: String,
    pub clir: ClirMode,
}

/// Phone number type octet used in `+CLIP`, `+CCWA` and `+CLCC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberType {
    Telephony = 129,
    International = 145,
}

impl NumberType {
    pub fn of(number: Option<&str>) -> Self {
        match number {
            Some(n) if n.starts_with('+') || n.starts_with("00") => NumberType::International,
            _ => NumberType::Telephony,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// One telephony call instance tracked by the call registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// oFono object path of the call
    pub path: String,
    /// VoiceCallManager (modem) path owning the call
    pub manager: String,
    pub status: CallStatus,
    pub direction: CallDirection,
    /// Part of a multiparty call
    pub conference: bool,
    /// Line identification, if presented
    pub number: Option<String>,
    /// A control operation is in flight and this call's final state is unknown
    pub status_pending: bool,
    /// Answer this call once the call being released disconnects
    pub waiting_for_answer: bool,
    /// Dial to place once this call reaches Held
    pub hold_dial: Option<PendingDial>,
}

impl Call {
    pub fn new(path: impl Into<String>, manager: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            manager: manager.into(),
            status: CallStatus::default(),
            direction: CallDirection::default(),
            conference: false,
            number: None,
            status_pending: false,
            waiting_for_answer: false,
            hold_dial: None,
        }
    }

    pub fn number_type(&self) -> NumberType {
        NumberType::of(self.number.as_deref())
    }
}

// ─────────────────────────────────────────────────────────
// Network / Modem
// ─────────────────────────────────────────────────────────

/// `org.ofono.NetworkRegistration.Status`, collapsed to what HFP reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Home,
    Roaming,
    #[default]
    NoService,
}

impl RegistrationStatus {
    pub fn from_ofono(status: &str) -> Self {
        match status {
            "registered" => Self::Home,
            "roaming" => Self::Roaming,
            _ => Self::NoService,
        }
    }
}

/// Cached network registration state of the active modem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkState {
    pub status: RegistrationStatus,
    /// Raw signal strength, 0-100
    pub strength: u8,
    pub operator: Option<String>,
}

impl NetworkState {
    /// Signal strength scaled to the 0-5 `signal` indicator range
    pub fn signal_bars(&self) -> u8 {
        ((u32::from(self.strength) + 20) / 21).min(5) as u8
    }

    pub fn has_service(&self) -> bool {
        self.status != RegistrationStatus::NoService
    }

    pub fn is_roaming(&self) -> bool {
        self.status == RegistrationStatus::Roaming
    }
}

/// Presence of the modem used for call control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModemState {
    /// No modem known (oFono absent or modem removed)
    #[default]
    NoModem,
    /// Modems are being inspected for network registration support
    Selecting,
    /// This modem is the active and preferred call manager
    Active(String),
}

impl ModemState {
    pub fn active_path(&self) -> Option<&str> {
        match self {
            ModemState::Active(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ModemState::Active(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_status_from_ofono() {
        assert_eq!(CallStatus::from_ofono("active"), Some(CallStatus::Active));
        assert_eq!(CallStatus::from_ofono("waiting"), Some(CallStatus::Waiting));
        assert_eq!(
            CallStatus::from_ofono("disconnected"),
            Some(CallStatus::Disconnected)
        );
        assert_eq!(CallStatus::from_ofono("ringing"), None);
    }

    #[test]
    fn test_clcc_codes() {
        assert_eq!(CallStatus::Active.clcc_code(), 0);
        assert_eq!(CallStatus::Held.clcc_code(), 1);
        assert_eq!(CallStatus::Waiting.clcc_code(), 5);
        assert_eq!(CallDirection::Originating.clcc_code(), 0);
        assert_eq!(CallDirection::Terminating.clcc_code(), 1);
    }

    #[test]
    fn test_clir_prefix() {
        assert_eq!(
            ClirMode::split_prefix("*31#12345"),
            ("12345", ClirMode::Enabled)
        );
        assert_eq!(
            ClirMode::split_prefix("#31#12345"),
            ("12345", ClirMode::Disabled)
        );
        assert_eq!(ClirMode::split_prefix("12345"), ("12345", ClirMode::Default));
    }

    #[test]
    fn test_number_type() {
        assert_eq!(NumberType::of(Some("+358401234")), NumberType::International);
        assert_eq!(NumberType::of(Some("00358401234")), NumberType::International);
        assert_eq!(NumberType::of(Some("0401234")), NumberType::Telephony);
        assert_eq!(NumberType::of(None), NumberType::Telephony);
        assert_eq!(NumberType::International.code(), 145);
    }

    #[test]
    fn test_signal_bars_endpoints() {
        let mut net = NetworkState::default();
        assert_eq!(net.signal_bars(), 0);
        net.strength = 100;
        assert_eq!(net.signal_bars(), 5);
        net.strength = 1;
        assert_eq!(net.signal_bars(), 1);
    }

    #[test]
    fn test_signal_bars_monotonic() {
        let mut prev = 0;
        for raw in 0..=100u8 {
            let net = NetworkState {
                strength: raw,
                ..Default::default()
            };
            let bars = net.signal_bars();
            assert!(bars >= prev, "raw {} went from {} to {}", raw, prev, bars);
            assert!(bars <= 5);
            prev = bars;
        }
    }

    #[test]
    fn test_registration_status() {
        assert_eq!(
            RegistrationStatus::from_ofono("registered"),
            RegistrationStatus::Home
        );
        assert_eq!(
            RegistrationStatus::from_ofono("roaming"),
            RegistrationStatus::Roaming
        );
        assert_eq!(
            RegistrationStatus::from_ofono("searching"),
            RegistrationStatus::NoService
        );
    }

    #[test]
    fn test_new_call_defaults() {
        let call = Call::new("/ril_0/voicecall01", "/ril_0");
        assert_eq!(call.status, CallStatus::Active);
        assert!(!call.status_pending);
        assert!(call.hold_dial.is_none());
    }
}

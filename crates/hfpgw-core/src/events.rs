//! Event definitions crossing the engine boundary
//!
//! [`HfpRequest`] / [`HfpEvent`] form the HF-facing side of the engine,
//! [`OfonoSignal`] is the decoded form of the telephony service's
//! asynchronous notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CmeError;
use crate::indicators::IndicatorInfo;
use crate::types::Properties;

// ─────────────────────────────────────────────────────────
// HF-facing requests
// ─────────────────────────────────────────────────────────

/// A request from the HFP layer, one per AT command it forwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HfpRequest {
    /// SLC established
    DeviceConnected,
    DeviceDisconnected,
    /// AT+CMER
    EventReporting { enable: bool },
    /// AT+BTRH
    ResponseAndHold,
    /// AT+BLDN
    LastDialedNumber,
    /// AT+CHUP
    TerminateCall,
    /// ATA
    AnswerCall,
    /// ATD
    DialNumber { number: String },
    /// AT+VTS
    TransmitDtmf { tone: String },
    /// AT+CNUM
    SubscriberNumber,
    /// AT+CLCC
    ListCurrentCalls,
    /// AT+COPS?
    OperatorSelection,
    /// AT+CHLD
    CallHold { command: String },
    /// AT+NREC
    NrAndEc { enable: bool },
    /// AT+CKPD
    KeyPress { keys: String },
    /// AT+BVRA
    VoiceDial { enable: bool },
}

impl HfpRequest {
    pub fn kind(&self) -> HfpRequestKind {
        match self {
            HfpRequest::DeviceConnected => HfpRequestKind::DeviceConnected,
            HfpRequest::DeviceDisconnected => HfpRequestKind::DeviceDisconnected,
            HfpRequest::EventReporting { .. } => HfpRequestKind::EventReporting,
            HfpRequest::ResponseAndHold => HfpRequestKind::ResponseAndHold,
            HfpRequest::LastDialedNumber => HfpRequestKind::LastDialedNumber,
            HfpRequest::TerminateCall => HfpRequestKind::TerminateCall,
            HfpRequest::AnswerCall => HfpRequestKind::AnswerCall,
            HfpRequest::DialNumber { .. } => HfpRequestKind::DialNumber,
            HfpRequest::TransmitDtmf { .. } => HfpRequestKind::TransmitDtmf,
            HfpRequest::SubscriberNumber => HfpRequestKind::SubscriberNumber,
            HfpRequest::ListCurrentCalls => HfpRequestKind::ListCurrentCalls,
            HfpRequest::OperatorSelection => HfpRequestKind::OperatorSelection,
            HfpRequest::CallHold { .. } => HfpRequestKind::CallHold,
            HfpRequest::NrAndEc { .. } => HfpRequestKind::NrAndEc,
            HfpRequest::KeyPress { .. } => HfpRequestKind::KeyPress,
            HfpRequest::VoiceDial { .. } => HfpRequestKind::VoiceDial,
        }
    }
}

/// Payload-free tag of an [`HfpRequest`], echoed in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HfpRequestKind {
    DeviceConnected,
    DeviceDisconnected,
    EventReporting,
    ResponseAndHold,
    LastDialedNumber,
    TerminateCall,
    AnswerCall,
    DialNumber,
    TransmitDtmf,
    SubscriberNumber,
    ListCurrentCalls,
    OperatorSelection,
    CallHold,
    NrAndEc,
    KeyPress,
    VoiceDial,
}

// ─────────────────────────────────────────────────────────
// HF-facing events
// ─────────────────────────────────────────────────────────

/// Something the HFP layer must relay to the HF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HfpEvent {
    /// Telephony backend is ready; sent once at startup
    Ready {
        features: u32,
        supp_features: u32,
        indicators: Vec<IndicatorInfo>,
        chld: String,
    },

    /// Unsolicited indicator update (`+CIEV`)
    Indicator { name: String, value: u8 },

    /// Ringing incoming call (`RING` + `+CLIP`)
    IncomingCall {
        number: String,
        number_type: u8,
        /// The call was waiting before it started ringing
        waiting: bool,
    },

    /// `+CCWA`
    CallWaiting { number: String, number_type: u8 },

    /// Stop ringing
    CallingStopped,

    /// One `+CLCC` row
    CurrentCall {
        index: usize,
        direction: u8,
        status: u8,
        mode: u8,
        multiparty: bool,
        number: String,
        number_type: u8,
    },

    /// `+COPS` response
    OperatorSelection { mode: u8, name: String },

    /// Final result of an [`HfpRequest`]; `error` is `None` for OK
    Response {
        request: HfpRequestKind,
        error: Option<CmeError>,
    },
}

impl HfpEvent {
    pub fn ok(request: HfpRequestKind) -> Self {
        HfpEvent::Response {
            request,
            error: None,
        }
    }

    pub fn response(request: HfpRequestKind, result: Result<(), CmeError>) -> Self {
        HfpEvent::Response {
            request,
            error: result.err(),
        }
    }

    pub fn indicator(name: impl Into<String>, value: u8) -> Self {
        HfpEvent::Indicator {
            name: name.into(),
            value,
        }
    }
}

// ─────────────────────────────────────────────────────────
// oFono notifications
// ─────────────────────────────────────────────────────────

/// A decoded oFono signal
#[derive(Debug, Clone, PartialEq)]
pub enum OfonoSignal {
    /// `Manager.ModemAdded(o, a{sv})`
    ModemAdded { path: String, properties: Properties },

    /// `Manager.ModemRemoved(o)`
    ModemRemoved { path: String },

    /// `Modem.PropertyChanged(s, v)`
    ModemPropertyChanged {
        path: String,
        name: String,
        value: Value,
    },

    /// `NetworkRegistration.PropertyChanged(s, v)`
    NetworkPropertyChanged {
        path: String,
        name: String,
        value: Value,
    },

    /// `VoiceCallManager.CallAdded(o, a{sv})` emitted by `manager`
    CallAdded {
        manager: String,
        path: String,
        properties: Properties,
    },

    /// `VoiceCallManager.CallRemoved(o)` emitted by `manager`
    CallRemoved { manager: String, path: String },

    /// `VoiceCall.PropertyChanged(s, v)`
    CallPropertyChanged {
        path: String,
        name: String,
        value: Value,
    },
}

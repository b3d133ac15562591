//! NDJSON bridge protocol
//!
//! The process owning the system bus connection and the RFCOMM channel
//! talks to hfpgw with one JSON object per line. Inbound frames carry bus
//! signals, method replies, HFP requests and battery readings; outbound
//! frames carry method calls, signal match rules and HFP events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use hfpgw_core::prelude::*;
use hfpgw_core::{HfpEvent, HfpRequest, OfonoSignal, Properties};

use crate::commands::{
    OFONO_MANAGER_INTERFACE, OFONO_MODEM_INTERFACE, OFONO_NETWORKREG_INTERFACE,
    OFONO_VCMANAGER_INTERFACE, OFONO_VC_INTERFACE,
};

// ─────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────

/// One line read from the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// `org.ofono` appeared on or vanished from the bus
    Service { present: bool },

    /// A bus signal matching one of our rules
    Signal {
        path: String,
        interface: String,
        member: String,
        #[serde(default)]
        args: Vec<Value>,
    },

    /// Method return for request `id`
    Return {
        id: u64,
        #[serde(default)]
        body: Vec<Value>,
    },

    /// Error reply for request `id`
    Error {
        id: u64,
        name: String,
        #[serde(default)]
        message: String,
    },

    /// A request from the HFP layer
    Hfp { request: HfpRequest },

    /// Battery charge percentage from the bridge's battery source
    Battery { percent: u8 },
}

/// Parse a single bridge line
pub fn parse_inbound(line: &str) -> Result<InboundFrame> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::protocol("empty line"));
    }
    Ok(serde_json::from_str(line)?)
}

// ─────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────

/// Signal match rule; `None` fields match anything
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalMatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub interface: String,
    pub member: String,
}

impl SignalMatch {
    /// Rule for a signal emitted by the oFono service from any object
    pub fn service(interface: &str, member: &str) -> Self {
        Self {
            sender: Some(crate::commands::OFONO_BUS.to_string()),
            path: None,
            interface: interface.to_string(),
            member: member.to_string(),
        }
    }

    /// Rule for `VoiceCall.PropertyChanged` on a single call object
    pub fn call_properties(path: &str) -> Self {
        Self {
            sender: None,
            path: Some(path.to_string()),
            interface: OFONO_VC_INTERFACE.to_string(),
            member: "PropertyChanged".to_string(),
        }
    }
}

/// One line written to the bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Method call to issue on the bus
    Call {
        id: u64,
        destination: String,
        path: String,
        interface: String,
        method: String,
        args: Vec<Value>,
    },

    AddMatch {
        #[serde(rename = "match")]
        rule: SignalMatch,
    },

    RemoveMatch {
        #[serde(rename = "match")]
        rule: SignalMatch,
    },

    /// Event to relay to the HF
    Hfp { event: HfpEvent },
}

impl OutboundFrame {
    /// Serialize as a single NDJSON line (without the trailing newline)
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// `Interface.Method` of a call frame
    pub fn method(&self) -> Option<String> {
        match self {
            OutboundFrame::Call {
                interface, method, ..
            } => Some(format!("{}.{}", interface, method)),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Signal & reply decoding
// ─────────────────────────────────────────────────────────

/// Decode a bus signal into an [`OfonoSignal`].
///
/// Returns `Ok(None)` for signals hfpgw has no interest in and an error when
/// a known signal carries arguments of the wrong shape.
pub fn decode_signal(
    path: &str,
    interface: &str,
    member: &str,
    args: &[Value],
) -> Result<Option<OfonoSignal>> {
    let signal = match (interface, member) {
        (OFONO_MANAGER_INTERFACE, "ModemAdded") => OfonoSignal::ModemAdded {
            path: object_path_arg(args, 0, member)?,
            properties: properties_arg(args, 1, member)?,
        },
        (OFONO_MANAGER_INTERFACE, "ModemRemoved") => OfonoSignal::ModemRemoved {
            path: object_path_arg(args, 0, member)?,
        },
        (OFONO_MODEM_INTERFACE, "PropertyChanged") => {
            let (name, value) = property_changed_args(args)?;
            OfonoSignal::ModemPropertyChanged {
                path: path.to_string(),
                name,
                value,
            }
        }
        (OFONO_NETWORKREG_INTERFACE, "PropertyChanged") => {
            let (name, value) = property_changed_args(args)?;
            OfonoSignal::NetworkPropertyChanged {
                path: path.to_string(),
                name,
                value,
            }
        }
        (OFONO_VCMANAGER_INTERFACE, "CallAdded") => OfonoSignal::CallAdded {
            manager: path.to_string(),
            path: object_path_arg(args, 0, member)?,
            properties: properties_arg(args, 1, member)?,
        },
        (OFONO_VCMANAGER_INTERFACE, "CallRemoved") => OfonoSignal::CallRemoved {
            manager: path.to_string(),
            path: object_path_arg(args, 0, member)?,
        },
        (OFONO_VC_INTERFACE, "PropertyChanged") => {
            let (name, value) = property_changed_args(args)?;
            OfonoSignal::CallPropertyChanged {
                path: path.to_string(),
                name,
                value,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(signal))
}

/// Decode an `a(oa{sv})` reply body (`GetModems`, `GetCalls`)
pub fn parse_object_list(body: &[Value]) -> Result<Vec<(String, Properties)>> {
    let list = body
        .first()
        .and_then(Value::as_array)
        .ok_or_else(|| Error::protocol("expected an array of (object, properties)"))?;

    list.iter()
        .map(|entry| {
            let pair = entry
                .as_array()
                .filter(|pair| pair.len() == 2)
                .ok_or_else(|| Error::protocol("expected an (object, properties) pair"))?;
            let path = pair[0]
                .as_str()
                .ok_or_else(|| Error::protocol("object path is not a string"))?;
            let props = pair[1]
                .as_object()
                .ok_or_else(|| Error::protocol("properties are not a dictionary"))?;
            Ok((path.to_string(), props.clone()))
        })
        .collect()
}

/// Decode an `a{sv}` reply body (`GetProperties`)
pub fn parse_properties(body: &[Value]) -> Result<Properties> {
    properties_arg(body, 0, "GetProperties")
}

fn object_path_arg(args: &[Value], index: usize, member: &str) -> Result<String> {
    args.get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::protocol(format!("{}: argument {} is not an object path", member, index)))
}

fn properties_arg(args: &[Value], index: usize, member: &str) -> Result<Properties> {
    args.get(index)
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| Error::protocol(format!("{}: argument {} is not a dictionary", member, index)))
}

fn property_changed_args(args: &[Value]) -> Result<(String, Value)> {
    let name = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| Error::protocol("PropertyChanged: missing property name"))?;
    let value = args
        .get(1)
        .cloned()
        .ok_or_else(|| Error::protocol("PropertyChanged: missing property value"))?;
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_service_frame() {
        let frame = parse_inbound(r#"{"type":"service","present":true}"#).unwrap();
        assert_eq!(frame, InboundFrame::Service { present: true });
    }

    #[test]
    fn test_parse_return_defaults_body() {
        let frame = parse_inbound(r#"{"type":"return","id":7}"#).unwrap();
        assert_eq!(frame, InboundFrame::Return { id: 7, body: vec![] });
    }

    #[test]
    fn test_parse_hfp_frame() {
        let frame =
            parse_inbound(r#"{"type":"hfp","request":{"kind":"dial_number","number":"123"}}"#)
                .unwrap();
        assert_eq!(
            frame,
            InboundFrame::Hfp {
                request: HfpRequest::DialNumber {
                    number: "123".to_string()
                }
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_inbound("").is_err());
        assert!(parse_inbound("not json").is_err());
        assert!(parse_inbound(r#"{"type":"teleport"}"#).is_err());
        assert!(parse_inbound(r#"{"type":"battery","percent":"full"}"#).is_err());
    }

    #[test]
    fn test_decode_call_added() {
        let sig = decode_signal(
            "/ril_0",
            OFONO_VCMANAGER_INTERFACE,
            "CallAdded",
            &[json!("/ril_0/voicecall01"), json!({"State": "incoming"})],
        )
        .unwrap()
        .unwrap();
        match sig {
            OfonoSignal::CallAdded {
                manager,
                path,
                properties,
            } => {
                assert_eq!(manager, "/ril_0");
                assert_eq!(path, "/ril_0/voicecall01");
                assert_eq!(properties["State"], "incoming");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_property_changed() {
        let sig = decode_signal(
            "/ril_0/voicecall01",
            OFONO_VC_INTERFACE,
            "PropertyChanged",
            &[json!("State"), json!("held")],
        )
        .unwrap();
        assert_eq!(
            sig,
            Some(OfonoSignal::CallPropertyChanged {
                path: "/ril_0/voicecall01".to_string(),
                name: "State".to_string(),
                value: json!("held"),
            })
        );
    }

    #[test]
    fn test_decode_malformed_signal() {
        let res = decode_signal(
            "/",
            OFONO_MANAGER_INTERFACE,
            "ModemAdded",
            &[json!(42), json!({})],
        );
        assert!(res.is_err());

        let res = decode_signal("/ril_0", OFONO_VC_INTERFACE, "PropertyChanged", &[json!("State")]);
        assert!(res.is_err());
    }

    #[test]
    fn test_decode_uninteresting_signal() {
        let res = decode_signal("/ril_0", "org.ofono.SimManager", "PropertyChanged", &[]).unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_parse_object_list() {
        let body = vec![json!([
            ["/ril_0", {"Powered": true}],
            ["/ril_1", {}]
        ])];
        let list = parse_object_list(&body).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].0, "/ril_0");
        assert_eq!(list[0].1["Powered"], true);
    }

    #[test]
    fn test_parse_object_list_malformed() {
        assert!(parse_object_list(&[]).is_err());
        assert!(parse_object_list(&[json!([["/ril_0"]])]).is_err());
        assert!(parse_object_list(&[json!([[1, {}]])]).is_err());
    }

    #[test]
    fn test_outbound_call_line() {
        let frame = OutboundFrame::Call {
            id: 3,
            destination: "org.ofono".to_string(),
            path: "/ril_0".to_string(),
            interface: OFONO_VCMANAGER_INTERFACE.to_string(),
            method: "SwapCalls".to_string(),
            args: vec![],
        };
        let line = frame.to_line().unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["type"], "call");
        assert_eq!(parsed["id"], 3);
        assert_eq!(
            frame.method().as_deref(),
            Some("org.ofono.VoiceCallManager.SwapCalls")
        );
    }

    #[test]
    fn test_outbound_match_line() {
        let frame = OutboundFrame::AddMatch {
            rule: SignalMatch::call_properties("/ril_0/voicecall01"),
        };
        let parsed: Value = serde_json::from_str(&frame.to_line().unwrap()).unwrap();
        assert_eq!(parsed["type"], "add_match");
        assert_eq!(parsed["match"]["path"], "/ril_0/voicecall01");
        assert!(parsed["match"].get("sender").is_none());
    }
}

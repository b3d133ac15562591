//! Message types for the gateway (TEA pattern)

use serde_json::Value;

use hfpgw_core::prelude::*;
use hfpgw_core::{HfpRequest, OfonoSignal, PendingDial};
use hfpgw_modem::{decode_signal, InboundFrame};

/// Everything the engine reacts to, processed strictly in arrival order
#[derive(Debug, Clone)]
pub enum Message {
    /// oFono appeared on the bus
    ServiceAppeared,

    /// oFono left the bus
    ServiceVanished,

    /// Decoded oFono signal
    Signal(OfonoSignal),

    /// Successful reply to a request
    MethodReturn { id: u64, body: Vec<Value> },

    /// Error reply to a request
    MethodError {
        id: u64,
        name: String,
        message: String,
    },

    /// Request from the HFP layer
    Hfp(HfpRequest),

    /// Battery charge percentage
    BatteryLevel { percent: u8 },

    /// The post-hold delay for a stashed dial has elapsed
    DeferredDial {
        call: String,
        manager: String,
        dial: PendingDial,
    },

    /// Periodic housekeeping
    Tick,

    /// Shut down
    Quit,
}

impl Message {
    /// Convert a bridge frame into a message.
    ///
    /// Signals hfpgw does not subscribe to yield `Ok(None)`; malformed
    /// signal arguments are an error.
    pub fn from_inbound(frame: InboundFrame) -> Result<Option<Message>> {
        let msg = match frame {
            InboundFrame::Service { present: true } => Message::ServiceAppeared,
            InboundFrame::Service { present: false } => Message::ServiceVanished,
            InboundFrame::Signal {
                path,
                interface,
                member,
                args,
            } => match decode_signal(&path, &interface, &member, &args)? {
                Some(signal) => Message::Signal(signal),
                None => {
                    trace!("Ignoring signal {}.{} from {}", interface, member, path);
                    return Ok(None);
                }
            },
            InboundFrame::Return { id, body } => Message::MethodReturn { id, body },
            InboundFrame::Error { id, name, message } => {
                Message::MethodError { id, name, message }
            }
            InboundFrame::Hfp { request } => Message::Hfp(request),
            InboundFrame::Battery { percent } => Message::BatteryLevel { percent },
        };
        Ok(Some(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfpgw_modem::parse_inbound;

    #[test]
    fn test_from_inbound_service() {
        let frame = parse_inbound(r#"{"type":"service","present":false}"#).unwrap();
        assert!(matches!(
            Message::from_inbound(frame).unwrap(),
            Some(Message::ServiceVanished)
        ));
    }

    #[test]
    fn test_from_inbound_signal() {
        let frame = parse_inbound(
            r#"{"type":"signal","path":"/","interface":"org.ofono.Manager","member":"ModemRemoved","args":["/ril_0"]}"#,
        )
        .unwrap();
        match Message::from_inbound(frame).unwrap() {
            Some(Message::Signal(OfonoSignal::ModemRemoved { path })) => assert_eq!(path, "/ril_0"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_from_inbound_malformed_signal() {
        let frame = parse_inbound(
            r#"{"type":"signal","path":"/","interface":"org.ofono.Manager","member":"ModemRemoved","args":[]}"#,
        )
        .unwrap();
        assert!(Message::from_inbound(frame).is_err());
    }
}

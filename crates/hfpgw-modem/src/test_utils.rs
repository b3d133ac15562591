//! Test utilities for the bridge channel
//!
//! Provides a [`CommandSender`] wired to an inspectable receiver.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::commands::{CommandSender, RequestTracker};
use crate::protocol::OutboundFrame;

/// Creates a sender whose frames can be read back from the returned receiver.
pub fn test_sender(capacity: usize) -> (CommandSender, mpsc::Receiver<OutboundFrame>) {
    let (tx, rx) = mpsc::channel(capacity);
    (CommandSender::new(tx, Arc::new(RequestTracker::new())), rx)
}

/// Collects every frame currently queued on `rx`.
pub fn drain_frames(rx: &mut mpsc::Receiver<OutboundFrame>) -> Vec<OutboundFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        frames.push(frame);
    }
    frames
}

/// A method call frame reduced to the parts tests assert on.
#[derive(Debug, Clone, PartialEq)]
pub struct SentCall {
    pub id: u64,
    pub path: String,
    /// `Interface.Method`
    pub method: String,
    pub args: Vec<Value>,
}

/// Keeps only the method call frames of `frames`.
pub fn sent_calls(frames: &[OutboundFrame]) -> Vec<SentCall> {
    frames
        .iter()
        .filter_map(|frame| match frame {
            OutboundFrame::Call {
                id,
                path,
                interface,
                method,
                args,
                ..
            } => Some(SentCall {
                id: *id,
                path: path.clone(),
                method: format!("{}.{}", interface, method),
                args: args.clone(),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OfonoCommand;

    #[test]
    fn test_sent_calls_filters_frames() {
        let (sender, mut rx) = test_sender(8);
        sender
            .watch(crate::protocol::SignalMatch::call_properties("/ril_0/voicecall01"))
            .unwrap();
        sender
            .send_fire_and_forget(OfonoCommand::SwapCalls {
                manager: "/ril_0".into(),
            })
            .unwrap();

        let frames = drain_frames(&mut rx);
        assert_eq!(frames.len(), 2);

        let calls = sent_calls(&frames);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "org.ofono.VoiceCallManager.SwapCalls");
        assert_eq!(calls[0].path, "/ril_0");
    }
}

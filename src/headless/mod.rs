//! Headless mode - the gateway speaking NDJSON over stdin/stdout
//!
//! A bridge process owns the system bus and the Bluetooth stack. It writes
//! service presence, signals, method replies, HFP requests and battery
//! readings to our stdin, and reads method calls, match rules and HFP
//! events from our stdout.
//!
//! # Example Traffic
//!
//! ```json
//! {"type":"service","present":true}
//! {"type":"call","id":1,"destination":"org.ofono","path":"/","interface":"org.ofono.Manager","method":"GetModems","args":[]}
//! {"type":"return","id":1,"body":[[["/ril_0",{"Interfaces":["org.ofono.NetworkRegistration"]}]]]}
//! {"type":"hfp","request":{"kind":"answer_call"}}
//! {"type":"hfp","event":{"event":"response","request":"answer_call","error":"not_allowed"}}
//! ```

pub mod runner;

use std::io::BufRead;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use hfpgw_app::Message;
use hfpgw_core::prelude::*;
use hfpgw_modem::{parse_inbound, OutboundFrame};

pub use runner::run_headless;

/// Convert one bridge line into an engine message.
///
/// Blank lines and signals hfpgw does not handle yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Message>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let frame = parse_inbound(line)?;
    Message::from_inbound(frame)
}

/// Forward bridge lines to the engine until EOF, then ask it to quit.
///
/// Blocking; run on a dedicated thread.
pub fn forward_lines<R: BufRead>(reader: R, msg_tx: mpsc::Sender<Message>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read bridge input: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Ok(Some(msg)) => {
                if msg_tx.blocking_send(msg).is_err() {
                    debug!("Engine gone, stopping bridge reader");
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Dropping bridge line: {}", e),
        }
    }

    info!("Bridge input closed");
    let _ = msg_tx.blocking_send(Message::Quit);
}

/// Write outbound frames as NDJSON until every sender is dropped
pub async fn write_frames<W: AsyncWrite + Unpin>(
    mut rx: mpsc::Receiver<OutboundFrame>,
    mut writer: W,
) -> Result<()> {
    while let Some(frame) = rx.recv().await {
        let mut line = frame.to_line()?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

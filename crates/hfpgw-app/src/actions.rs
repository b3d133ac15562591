//! Action handlers: UpdateAction dispatch and background task spawning

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use hfpgw_core::prelude::*;

use crate::handler::UpdateAction;
use crate::message::Message;

/// Interval between housekeeping ticks
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Deferred dial timers keyed by the held call's path
pub type DialTimerMap = HashMap<String, JoinHandle<()>>;

/// Execute an action, spawning a background task where needed
pub fn handle_action(
    action: UpdateAction,
    msg_tx: mpsc::Sender<Message>,
    dial_timers: &mut DialTimerMap,
    shutdown_rx: watch::Receiver<bool>,
) {
    match action {
        UpdateAction::ScheduleDial {
            call,
            manager,
            dial,
            delay,
        } => {
            debug!("Dial scheduled on {} in {:?}", call, delay);
            let message = Message::DeferredDial {
                call: call.clone(),
                manager,
                dial,
            };
            let handle = spawn_delayed(message, delay, msg_tx, shutdown_rx);
            if let Some(previous) = dial_timers.insert(call, handle) {
                previous.abort();
            }
        }

        UpdateAction::CancelDial { call } => {
            if let Some(handle) = dial_timers.remove(&call) {
                debug!("Cancelling scheduled dial on {}", call);
                handle.abort();
            }
        }
    }
}

/// Feed `message` back into the engine after `delay`
fn spawn_delayed(
    message: Message,
    delay: Duration,
    msg_tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                if msg_tx.send(message).await.is_err() {
                    debug!("Engine gone before deferred message");
                }
            }
            _ = shutdown_rx.changed() => {}
        }
    })
}

/// Send `Message::Tick` every [`TICK_INTERVAL`] until shutdown
pub fn spawn_tick_task(
    msg_tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if msg_tx.send(Message::Tick).await.is_err() {
                        break;
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    })
}

/// Poll a statefs charge file and report its value as `Message::BatteryLevel`
pub fn spawn_battery_poller(
    path: PathBuf,
    poll_interval: Duration,
    msg_tx: mpsc::Sender<Message>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Polling battery level from {}", path.display());
        let mut interval = tokio::time::interval(poll_interval);
        let mut last = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let percent = match read_battery_percent(&path).await {
                        Ok(percent) => percent,
                        Err(e) => {
                            warn!("Battery level unavailable: {}", e);
                            continue;
                        }
                    };
                    if last == Some(percent) {
                        continue;
                    }
                    last = Some(percent);
                    if msg_tx.send(Message::BatteryLevel { percent }).await.is_err() {
                        break;
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    })
}

/// Read a charge percentage; values above 100 are clamped
pub async fn read_battery_percent(path: &Path) -> Result<u8> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let value: u64 = contents
        .trim()
        .parse()
        .map_err(|_| Error::protocol(format!("invalid charge level '{}'", contents.trim())))?;
    Ok(value.min(100) as u8)
}

//! Engine - owns the gateway state and drives the message loop
//!
//! All state mutation happens in [`Engine::process_message`]. oFono replies,
//! signals, HFP requests and timer expiries all arrive as [`Message`]s on one
//! channel and are handled strictly in order.

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use hfpgw_core::prelude::*;
use hfpgw_core::HfpEvent;
use hfpgw_modem::commands::{
    OFONO_MANAGER_INTERFACE, OFONO_MODEM_INTERFACE, OFONO_NETWORKREG_INTERFACE,
    OFONO_VCMANAGER_INTERFACE,
};
use hfpgw_modem::{CommandSender, OutboundFrame, RequestTracker, SignalMatch};

use crate::actions::{self, DialTimerMap};
use crate::config::{BatterySource, Settings};
use crate::handler::{self, UpdateAction};
use crate::message::Message;
use crate::state::{AppState, GatewayPhase};

/// Capacity of the engine's message channel
const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the event broadcast
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Signals subscribed to for the lifetime of the engine
const GLOBAL_SIGNALS: &[(&str, &str)] = &[
    (OFONO_MANAGER_INTERFACE, "ModemAdded"),
    (OFONO_MANAGER_INTERFACE, "ModemRemoved"),
    (OFONO_MODEM_INTERFACE, "PropertyChanged"),
    (OFONO_NETWORKREG_INTERFACE, "PropertyChanged"),
    (OFONO_VCMANAGER_INTERFACE, "CallAdded"),
    (OFONO_VCMANAGER_INTERFACE, "CallRemoved"),
];

pub struct Engine {
    pub state: AppState,

    msg_tx: mpsc::Sender<Message>,
    msg_rx: mpsc::Receiver<Message>,

    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,

    /// HFP events, for observers other than the bridge
    event_tx: broadcast::Sender<HfpEvent>,

    dial_timers: DialTimerMap,
    background: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Create an engine writing bridge frames to `frame_tx`
    pub fn new(settings: Settings, frame_tx: mpsc::Sender<OutboundFrame>) -> Self {
        let sender = CommandSender::new(frame_tx, std::sync::Arc::new(RequestTracker::new()));
        let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            state: AppState::new(settings, sender),
            msg_tx,
            msg_rx,
            shutdown_tx,
            shutdown_rx,
            event_tx,
            dial_timers: DialTimerMap::new(),
            background: Vec::new(),
        }
    }

    /// Announce readiness, subscribe to oFono signals and start background tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        for (interface, member) in GLOBAL_SIGNALS {
            self.state
                .sender
                .watch(SignalMatch::service(interface, member))
                .with_context(|| format!("subscribing to {}.{}", interface, member))?;
        }

        let ready = self.state.ready_event();
        self.state.emit(ready);
        self.flush_events();

        self.background.push(actions::spawn_tick_task(
            self.msg_tx.clone(),
            self.shutdown_rx.clone(),
        ));

        let battery = &self.state.settings.battery;
        if battery.source == BatterySource::Statefs {
            self.background.push(actions::spawn_battery_poller(
                battery.path.clone(),
                battery.poll_interval(),
                self.msg_tx.clone(),
                self.shutdown_rx.clone(),
            ));
        }

        info!("Engine started");
        Ok(())
    }

    /// Sender for feeding messages into the engine
    pub fn msg_sender(&self) -> mpsc::Sender<Message> {
        self.msg_tx.clone()
    }

    /// Observe every HFP event the engine produces
    pub fn subscribe(&self) -> broadcast::Receiver<HfpEvent> {
        self.event_tx.subscribe()
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn should_quit(&self) -> bool {
        self.state.should_quit()
    }

    /// Process one message, run its actions and deliver its events
    pub fn process_message(&mut self, msg: Message) {
        if let Message::DeferredDial { call, .. } = &msg {
            self.dial_timers.remove(call);
        }

        let result = handler::update(&mut self.state, msg);
        for action in result.actions {
            self.handle_action(action);
        }

        self.flush_events();
    }

    /// Process every message currently queued without waiting
    pub fn drain_pending_messages(&mut self) {
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.process_message(msg);
        }
    }

    /// Run until a `Quit` message arrives or every sender is gone
    pub async fn run(&mut self) {
        while !self.should_quit() {
            match self.msg_rx.recv().await {
                Some(msg) => self.process_message(msg),
                None => break,
            }
        }
    }

    /// Stop background tasks and drop outstanding requests
    pub fn shutdown(&mut self) {
        let cancelled = self.state.sender.tracker().cancel_all();
        if cancelled > 0 {
            debug!("Cancelled {} pending requests", cancelled);
        }

        for (_, handle) in self.dial_timers.drain() {
            handle.abort();
        }

        let _ = self.shutdown_tx.send(true);
        for handle in self.background.drain(..) {
            handle.abort();
        }
        info!("Engine stopped");
    }

    /// Number of deferred dials waiting on their timer
    pub fn scheduled_dials(&self) -> usize {
        self.dial_timers.len()
    }

    fn handle_action(&mut self, action: UpdateAction) {
        actions::handle_action(
            action,
            self.msg_tx.clone(),
            &mut self.dial_timers,
            self.shutdown_rx.clone(),
        );
    }

    /// Deliver queued HFP events to the bridge and subscribers
    fn flush_events(&mut self) {
        for event in self.state.take_events() {
            // No subscribers is fine
            let _ = self.event_tx.send(event.clone());

            if let Err(e) = self.state.sender.emit(event) {
                error!("Failed to deliver HFP event: {}", e);
                if e.is_fatal() {
                    self.state.phase = GatewayPhase::Quitting;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use hfpgw_core::{HfpRequest, HfpRequestKind, OfonoSignal, Properties};
    use hfpgw_modem::test_utils::{drain_frames, sent_calls};

    const MODEM: &str = "/ril_0";
    const CALL: &str = "/ril_0/voicecall01";

    fn props(value: serde_json::Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    fn engine() -> (Engine, mpsc::Receiver<OutboundFrame>) {
        let (frame_tx, frame_rx) = mpsc::channel(256);
        (Engine::new(Settings::default(), frame_tx), frame_rx)
    }

    /// Bring the engine to an active modem with its initial queries answered
    fn activate(engine: &mut Engine, frames: &mut mpsc::Receiver<OutboundFrame>) {
        engine.process_message(Message::ServiceAppeared);
        let get_modems = sent_calls(&drain_frames(frames));
        engine.process_message(Message::MethodReturn {
            id: get_modems[0].id,
            body: vec![json!([[MODEM, {"Interfaces": ["org.ofono.NetworkRegistration"]}]])],
        });
        let get_props = sent_calls(&drain_frames(frames));
        engine.process_message(Message::MethodReturn {
            id: get_props[0].id,
            body: vec![json!({"Status": "registered", "Strength": 80})],
        });
        let get_calls = sent_calls(&drain_frames(frames));
        engine.process_message(Message::MethodReturn {
            id: get_calls[0].id,
            body: vec![json!([])],
        });
        drain_frames(frames);
    }

    fn add_call(engine: &mut Engine, path: &str, state: &str) {
        engine.process_message(Message::Signal(OfonoSignal::CallAdded {
            manager: MODEM.to_string(),
            path: path.to_string(),
            properties: props(json!({"State": state, "LineIdentification": "5550000"})),
        }));
    }

    #[tokio::test]
    async fn test_start_announces_ready_and_subscribes() {
        let (mut engine, mut frames) = engine();
        let mut events = engine.subscribe();
        engine.start().unwrap();

        let frames = drain_frames(&mut frames);
        let matches = frames
            .iter()
            .filter(|f| matches!(f, OutboundFrame::AddMatch { .. }))
            .count();
        assert_eq!(matches, GLOBAL_SIGNALS.len());

        match events.try_recv().unwrap() {
            HfpEvent::Ready { chld, indicators, .. } => {
                assert_eq!(chld, "0,1,1x,2,2x,3,4");
                assert_eq!(indicators.len(), 7);
            }
            other => panic!("unexpected {:?}", other),
        }
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_events_are_broadcast_and_bridged() {
        let (mut engine, mut frames) = engine();
        let mut events = engine.subscribe();

        engine.process_message(Message::Hfp(HfpRequest::SubscriberNumber));

        assert_eq!(
            events.try_recv().unwrap(),
            HfpEvent::ok(HfpRequestKind::SubscriberNumber)
        );
        let frames = drain_frames(&mut frames);
        assert!(matches!(frames.as_slice(), [OutboundFrame::Hfp { .. }]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_dial_runs_through_engine() {
        let (mut engine, mut frames) = engine();
        activate(&mut engine, &mut frames);
        add_call(&mut engine, CALL, "active");
        drain_frames(&mut frames);

        engine.process_message(Message::Hfp(HfpRequest::DialNumber {
            number: "5551234".to_string(),
        }));
        let swap = sent_calls(&drain_frames(&mut frames));
        assert_eq!(swap[0].method, "org.ofono.VoiceCallManager.SwapCalls");

        engine.process_message(Message::Signal(OfonoSignal::CallPropertyChanged {
            path: CALL.to_string(),
            name: "State".to_string(),
            value: json!("held"),
        }));
        assert_eq!(engine.scheduled_dials(), 1);
        assert!(sent_calls(&drain_frames(&mut frames)).is_empty());

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        engine.drain_pending_messages();

        assert_eq!(engine.scheduled_dials(), 0);
        let dial = sent_calls(&drain_frames(&mut frames));
        assert_eq!(dial.len(), 1);
        assert_eq!(dial[0].method, "org.ofono.VoiceCallManager.Dial");
        assert_eq!(dial[0].args, vec![json!("5551234"), json!("default")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deferred_dial_cancelled_when_call_released() {
        let (mut engine, mut frames) = engine();
        activate(&mut engine, &mut frames);
        add_call(&mut engine, CALL, "active");

        engine.process_message(Message::Hfp(HfpRequest::DialNumber {
            number: "5551234".to_string(),
        }));
        engine.process_message(Message::Signal(OfonoSignal::CallPropertyChanged {
            path: CALL.to_string(),
            name: "State".to_string(),
            value: json!("held"),
        }));
        engine.process_message(Message::Signal(OfonoSignal::CallRemoved {
            manager: MODEM.to_string(),
            path: CALL.to_string(),
        }));
        assert_eq!(engine.scheduled_dials(), 0);
        drain_frames(&mut frames);

        tokio::time::sleep(Duration::from_secs(2)).await;
        engine.drain_pending_messages();

        let calls = sent_calls(&drain_frames(&mut frames));
        assert!(calls
            .iter()
            .all(|c| c.method != "org.ofono.VoiceCallManager.Dial"));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_requests() {
        let (mut engine, mut frames) = engine();
        engine.process_message(Message::ServiceAppeared);
        let get_modems = sent_calls(&drain_frames(&mut frames));
        assert_eq!(engine.state.sender.tracker().pending_count(), 1);

        engine.shutdown();
        assert_eq!(engine.state.sender.tracker().pending_count(), 0);

        // A reply arriving after cancellation runs no continuation
        engine.process_message(Message::MethodReturn {
            id: get_modems[0].id,
            body: vec![json!([[MODEM, {"Interfaces": ["org.ofono.NetworkRegistration"]}]])],
        });
        assert!(!engine.state.modem.is_active());
        assert!(*engine.shutdown_receiver().borrow());
    }

    #[tokio::test]
    async fn test_run_stops_on_quit() {
        let (mut engine, _frames) = engine();
        let tx = engine.msg_sender();
        tx.send(Message::Hfp(HfpRequest::NrAndEc { enable: true }))
            .await
            .unwrap();
        tx.send(Message::Quit).await.unwrap();

        engine.run().await;
        assert!(engine.should_quit());
    }

    #[tokio::test]
    async fn test_closed_bridge_stops_engine() {
        let (mut engine, frames) = engine();
        drop(frames);

        engine.process_message(Message::Hfp(HfpRequest::SubscriberNumber));
        assert!(engine.should_quit());
    }
}

//! Integration tests driving the engine through bridge protocol lines

use serde_json::{json, Value};
use tokio::sync::mpsc;

use hfpgw::headless::parse_line;
use hfpgw_app::{Engine, Settings};
use hfpgw_modem::OutboundFrame;

struct Bridge {
    engine: Engine,
    frames: mpsc::Receiver<OutboundFrame>,
}

impl Bridge {
    fn new() -> Self {
        let (frame_tx, frames) = mpsc::channel(256);
        Self {
            engine: Engine::new(Settings::default(), frame_tx),
            frames,
        }
    }

    /// Feed one inbound line
    fn feed(&mut self, line: &str) {
        if let Some(msg) = parse_line(line).expect("valid bridge line") {
            self.engine.process_message(msg);
        }
    }

    fn feed_json(&mut self, value: Value) {
        self.feed(&value.to_string());
    }

    /// Everything written to the bridge since the last call, as JSON
    fn output(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(frame) = self.frames.try_recv() {
            let line = frame.to_line().unwrap();
            out.push(serde_json::from_str(&line).unwrap());
        }
        out
    }

    fn method_calls(&mut self) -> Vec<Value> {
        self.output()
            .into_iter()
            .filter(|v| v["type"] == "call")
            .collect()
    }

    fn hfp_events(&mut self) -> Vec<Value> {
        self.output()
            .into_iter()
            .filter(|v| v["type"] == "hfp")
            .map(|v| v["event"].clone())
            .collect()
    }

    fn reply(&mut self, call: &Value, body: Value) {
        self.feed_json(json!({"type": "return", "id": call["id"], "body": [body]}));
    }

    fn request(&mut self, request: Value) {
        self.feed_json(json!({"type": "hfp", "request": request}));
    }

    fn bring_up(&mut self) {
        self.feed(r#"{"type":"service","present":true}"#);
        let calls = self.method_calls();
        assert_eq!(calls[0]["method"], "GetModems");
        assert_eq!(calls[0]["destination"], "org.ofono");
        self.reply(
            &calls[0],
            json!([["/ril_0", {"Interfaces": ["org.ofono.NetworkRegistration"]}]]),
        );

        let calls = self.method_calls();
        assert_eq!(calls[0]["interface"], "org.ofono.NetworkRegistration");
        self.reply(
            &calls[0],
            json!({"Status": "registered", "Strength": 75, "Name": "Carrier"}),
        );

        let calls = self.method_calls();
        assert_eq!(calls[0]["method"], "GetCalls");
        self.reply(&calls[0], json!([]));
        self.output();
    }
}

#[tokio::test]
async fn test_ready_event_on_start() {
    let mut bridge = Bridge::new();
    bridge.engine.start().unwrap();

    let out = bridge.output();
    let subscriptions = out.iter().filter(|v| v["type"] == "add_match").count();
    assert_eq!(subscriptions, 6);

    let ready: Vec<_> = out
        .iter()
        .filter(|v| v["type"] == "hfp")
        .map(|v| &v["event"])
        .collect();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready[0]["event"], "ready");
    assert_eq!(ready[0]["chld"], "0,1,1x,2,2x,3,4");
    assert_eq!(ready[0]["indicators"][0]["name"], "battchg");

    bridge.engine.shutdown();
}

#[tokio::test]
async fn test_incoming_call_answered_over_bridge() {
    let mut bridge = Bridge::new();
    bridge.bring_up();
    bridge.request(json!({"kind": "event_reporting", "enable": true}));
    bridge.output();

    bridge.feed_json(json!({
        "type": "signal",
        "path": "/ril_0",
        "interface": "org.ofono.VoiceCallManager",
        "member": "CallAdded",
        "args": ["/ril_0/voicecall01", {"State": "incoming", "LineIdentification": "+15551234"}]
    }));

    let out = bridge.output();
    assert!(out
        .iter()
        .any(|v| v["type"] == "add_match" && v["match"]["path"] == "/ril_0/voicecall01"));
    let events: Vec<_> = out
        .iter()
        .filter(|v| v["type"] == "hfp")
        .map(|v| v["event"].clone())
        .collect();
    assert_eq!(events[0]["event"], "incoming_call");
    assert_eq!(events[0]["number"], "+15551234");
    assert_eq!(events[0]["number_type"], 145);
    assert!(events
        .iter()
        .any(|e| e["event"] == "indicator" && e["name"] == "callsetup" && e["value"] == 1));

    bridge.request(json!({"kind": "answer_call"}));
    let out = bridge.output();
    let answer: Vec<_> = out.iter().filter(|v| v["type"] == "call").collect();
    assert_eq!(answer[0]["path"], "/ril_0/voicecall01");
    assert_eq!(answer[0]["method"], "Answer");
    assert!(out
        .iter()
        .any(|v| v["event"]["event"] == "response" && v["event"]["error"].is_null()));

    bridge.feed_json(json!({
        "type": "signal",
        "path": "/ril_0/voicecall01",
        "interface": "org.ofono.VoiceCall",
        "member": "PropertyChanged",
        "args": ["State", "active"]
    }));
    let events = bridge.hfp_events();
    assert!(events.iter().any(|e| e["event"] == "calling_stopped"));
    assert!(events
        .iter()
        .any(|e| e["event"] == "indicator" && e["name"] == "call" && e["value"] == 1));
}

#[tokio::test]
async fn test_current_calls_and_operator() {
    let mut bridge = Bridge::new();
    bridge.bring_up();
    bridge.feed_json(json!({
        "type": "signal",
        "path": "/ril_0",
        "interface": "org.ofono.VoiceCallManager",
        "member": "CallAdded",
        "args": ["/ril_0/voicecall01", {"State": "dialing", "LineIdentification": "5550100"}]
    }));
    bridge.output();

    bridge.request(json!({"kind": "list_current_calls"}));
    let events = bridge.hfp_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "current_call");
    assert_eq!(events[0]["index"], 1);
    assert_eq!(events[0]["direction"], 0);
    assert_eq!(events[0]["status"], 2);
    assert_eq!(events[1]["event"], "response");

    bridge.request(json!({"kind": "operator_selection"}));
    let events = bridge.hfp_events();
    assert_eq!(events[0]["event"], "operator_selection");
    assert_eq!(events[0]["name"], "Carrier");
}

#[tokio::test]
async fn test_rejected_control_reported_as_cme_error() {
    let mut bridge = Bridge::new();
    bridge.bring_up();

    bridge.request(json!({"kind": "call_hold", "command": "3"}));
    let events = bridge.hfp_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["request"], "call_hold");
    assert_eq!(events[0]["error"], "not_allowed");

    bridge.request(json!({"kind": "dial_number", "number": ">5"}));
    let events = bridge.hfp_events();
    assert_eq!(events[0]["error"], "ag_failure");
}

#[tokio::test]
async fn test_modem_removal_over_bridge() {
    let mut bridge = Bridge::new();
    bridge.bring_up();
    bridge.feed_json(json!({
        "type": "signal",
        "path": "/ril_0",
        "interface": "org.ofono.VoiceCallManager",
        "member": "CallAdded",
        "args": ["/ril_0/voicecall01", {"State": "active"}]
    }));
    bridge.output();

    bridge.feed_json(json!({
        "type": "signal",
        "path": "/",
        "interface": "org.ofono.Manager",
        "member": "ModemRemoved",
        "args": ["/ril_0"]
    }));

    assert!(bridge.engine.state.registry.is_empty());
    let out = bridge.output();
    assert!(out
        .iter()
        .any(|v| v["type"] == "remove_match" && v["match"]["path"] == "/ril_0/voicecall01"));

    bridge.request(json!({"kind": "dial_number", "number": "5550100"}));
    let events = bridge.hfp_events();
    assert_eq!(events[0]["error"], "ag_failure");
}

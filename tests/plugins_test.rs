//! Integration tests for the default plugin set.
//!
//! Uses `ClientOptions::default()` plugins, so these also check that
//! the core plugins install together without colliding.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use devlink::plugins::StateChange;
use devlink::{
    create_client, ApiResponses, Benchmarking, Clearing, Client, ClientOptions, ImagePayload,
    Images, Logging, Repl, Socket, SocketEvent, StateResponses,
};

type Wire = Arc<Mutex<Vec<String>>>;

struct MockSocket(Wire);

impl Socket for MockSocket {
    fn send(&mut self, frame: &str) {
        self.0.lock().unwrap().push(frame.to_string());
    }

    fn close(&mut self) {}
}

fn connected() -> (Client, Wire) {
    let wire: Wire = Arc::default();
    let captured = Arc::clone(&wire);
    let options = ClientOptions::default()
        .with_socket(move |_url| Ok(Box::new(MockSocket(Arc::clone(&captured))) as Box<dyn Socket>));
    let mut client = create_client(options).unwrap();
    client.connect().unwrap();
    client.handle_event(SocketEvent::Open);
    (client, wire)
}

fn last(wire: &Wire) -> Value {
    serde_json::from_str(wire.lock().unwrap().last().unwrap()).unwrap()
}

#[test]
fn test_default_plugins_install_all_features() {
    let (client, _wire) = connected();
    for feature in [
        "log",
        "logImportant",
        "debug",
        "warn",
        "error",
        "image",
        "benchmark",
        "stateActionComplete",
        "stateValuesResponse",
        "stateKeysResponse",
        "stateValuesChange",
        "stateBackupResponse",
        "apiResponse",
        "clear",
        "repl",
    ] {
        assert!(client.has_feature(feature), "missing feature {feature}");
    }
    assert_eq!(client.plugins().len(), 7);
}

#[test]
fn test_logging_levels() {
    let (mut client, wire) = connected();

    client.log("plain").unwrap();
    assert_eq!(
        last(&wire)["payload"],
        json!({"level": "debug", "message": "plain"})
    );

    client.warn("careful").unwrap();
    let frame = last(&wire);
    assert_eq!(frame["payload"]["level"], "warn");
    assert_eq!(frame["important"], true);

    client.error("boom", Some("at main.rs:1")).unwrap();
    let frame = last(&wire);
    assert_eq!(frame["payload"]["level"], "error");
    assert_eq!(frame["payload"]["stack"], "at main.rs:1");
}

#[test]
fn test_every_typed_surface_sends_its_type() {
    let (mut client, wire) = connected();

    let mut image = ImagePayload::new("data:image/png;base64,AAAA");
    image.caption = Some("chart".into());
    client.image(&image).unwrap();
    assert_eq!(last(&wire)["type"], "image");

    client
        .api_response(json!({"url": "/x"}), json!({"status": 404}), 3.0)
        .unwrap();
    assert_eq!(last(&wire)["type"], "api.response");

    client
        .state_values_change(&[StateChange {
            path: "a".into(),
            value: json!(1),
        }])
        .unwrap();
    assert_eq!(last(&wire)["type"], "state.values.change");

    let bench = client.benchmark("noop").unwrap();
    bench.stop(&mut client, "done").unwrap();
    let frame = last(&wire);
    assert_eq!(frame["type"], "benchmark.report");
    assert_eq!(frame["payload"]["steps"].as_array().unwrap().len(), 2);

    client.clear().unwrap();
    assert_eq!(last(&wire)["type"], "clear");
}

#[test]
fn test_repl_round_trip_through_socket_events() {
    let (mut client, wire) = connected();
    client
        .repl("config", json!({"retries": 3, "hosts": ["a", "b"]}))
        .unwrap();

    client.handle_event(SocketEvent::Message(
        r#"{"type":"repl.cd.request","payload":"config"}"#.into(),
    ));
    client.handle_event(SocketEvent::Message(
        r#"{"type":"repl.execute.request","payload":"hosts.1"}"#.into(),
    ));

    let frame = last(&wire);
    assert_eq!(frame["type"], "repl.execute.response");
    assert_eq!(frame["payload"], "b");
}

#[test]
fn test_features_queue_before_connect() {
    let wire: Wire = Arc::default();
    let captured = Arc::clone(&wire);
    let options = ClientOptions::default()
        .with_socket(move |_url| Ok(Box::new(MockSocket(Arc::clone(&captured))) as Box<dyn Socket>));
    let mut client = create_client(options).unwrap();

    client.log("early").unwrap();
    assert_eq!(client.queued(), 1);

    client.connect().unwrap();
    client.handle_event(SocketEvent::Open);
    assert_eq!(last(&wire)["payload"]["message"], "early");
}

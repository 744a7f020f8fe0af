//! Integration tests for server-triggered custom commands.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use devlink::{
    create_client, ArgType, Client, ClientError, ClientOptions, CommandArgs, CustomCommand, Socket,
    SocketEvent,
};

type Wire = Arc<Mutex<Vec<String>>>;
type Calls = Arc<Mutex<Vec<Option<CommandArgs>>>>;

struct MockSocket(Wire);

impl Socket for MockSocket {
    fn send(&mut self, frame: &str) {
        self.0.lock().unwrap().push(frame.to_string());
    }

    fn close(&mut self) {}
}

fn client() -> (Client, Wire) {
    let wire: Wire = Arc::default();
    let captured = Arc::clone(&wire);
    let options = ClientOptions::default()
        .with_plugins(Vec::new())
        .with_socket(move |_url| Ok(Box::new(MockSocket(Arc::clone(&captured))) as Box<dyn Socket>));
    (create_client(options).unwrap(), wire)
}

fn frames(wire: &Wire) -> Vec<Value> {
    wire.lock()
        .unwrap()
        .iter()
        .map(|frame| serde_json::from_str(frame).unwrap())
        .collect()
}

fn open(client: &mut Client) {
    client.connect().unwrap();
    client.handle_event(SocketEvent::Open);
}

fn invoke(client: &mut Client, payload: Value) {
    let frame = json!({ "type": "custom", "payload": payload }).to_string();
    client.handle_event(SocketEvent::Message(frame));
}

fn noop(_client: &mut Client, _args: Option<CommandArgs>) {}

fn recorder(calls: &Calls) -> impl Fn(&mut Client, Option<CommandArgs>) + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    move |_client, args| calls.lock().unwrap().push(args)
}

#[test]
fn test_ping_invoked_once_without_args() {
    let calls: Calls = Arc::default();
    let (mut client, _wire) = client();
    client.on_custom_command(("ping", recorder(&calls))).unwrap();
    open(&mut client);

    invoke(&mut client, json!({"command": "ping"}));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], None);
}

#[test]
fn test_null_important_flag_still_dispatches() {
    let calls: Calls = Arc::default();
    let (mut client, _wire) = client();
    client.on_custom_command(("ping", recorder(&calls))).unwrap();
    open(&mut client);

    let frame = json!({"type": "custom", "payload": {"command": "ping"}, "important": null});
    client.handle_event(SocketEvent::Message(frame.to_string()));

    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[test]
fn test_ids_strictly_increase_from_one() {
    let (mut client, _wire) = client();
    let ids: Vec<u64> = (0..10)
        .map(|i| {
            client
                .on_custom_command((format!("cmd-{i}"), noop))
                .unwrap()
                .id()
        })
        .collect();

    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
}

#[test]
fn test_ids_not_reused_after_unregister() {
    let (mut client, _wire) = client();
    let first = client
        .on_custom_command(("a", noop))
        .unwrap();
    assert!(first.unregister(&mut client));
    let second = client
        .on_custom_command(("a", noop))
        .unwrap();
    assert!(second.id() > first.id());
}

#[test]
fn test_unregistered_command_not_dispatched() {
    let calls: Calls = Arc::default();
    let (mut client, wire) = client();
    let handle = client.on_custom_command(("gone", recorder(&calls))).unwrap();
    open(&mut client);

    assert!(handle.unregister(&mut client));
    assert!(!handle.unregister(&mut client));
    invoke(&mut client, json!({"command": "gone"}));
    invoke(&mut client, json!({"id": handle.id()}));

    assert!(calls.lock().unwrap().is_empty());
    let last = frames(&wire).pop().unwrap();
    assert_eq!(last["type"], "customCommand.unregister");
    assert_eq!(last["payload"], json!({"id": handle.id(), "command": "gone"}));
}

#[test]
fn test_commands_announced_after_queue_flush() {
    let (mut client, wire) = client();
    client.send("log", json!({"message": "queued"}), false);
    client
        .on_custom_command(
            CustomCommand::new("reset", noop)
                .title("Reset")
                .description("Reset local caches")
                .arg("scope", ArgType::String),
        )
        .unwrap();
    assert!(frames(&wire).is_empty());

    open(&mut client);

    let frames = frames(&wire);
    let types: Vec<&str> = frames.iter().map(|f| f["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["client.intro", "log", "customCommand.register"]);
    assert_eq!(
        frames[2]["payload"],
        json!({
            "id": 1,
            "command": "reset",
            "title": "Reset",
            "description": "Reset local caches",
            "args": [{"name": "scope", "type": "string"}],
        })
    );
}

#[test]
fn test_register_while_ready_announces_immediately() {
    let (mut client, wire) = client();
    open(&mut client);
    client
        .on_custom_command(("live", noop))
        .unwrap();

    let last = frames(&wire).pop().unwrap();
    assert_eq!(last["type"], "customCommand.register");
    assert_eq!(last["payload"]["command"], "live");
}

#[test]
fn test_dispatch_by_id_and_bare_name() {
    let calls: Calls = Arc::default();
    let (mut client, _wire) = client();
    let handle = client.on_custom_command(("go", recorder(&calls))).unwrap();
    open(&mut client);

    invoke(&mut client, json!({"id": handle.id(), "args": {"x": "1"}}));
    invoke(&mut client, json!("go"));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].as_ref().unwrap().get_str("x"), Some("1"));
    assert_eq!(calls[1], None);
}

#[test]
fn test_first_registration_wins_on_duplicate_names() {
    let first: Calls = Arc::default();
    let second: Calls = Arc::default();
    let (mut client, _wire) = client();
    client.on_custom_command(("dup", recorder(&first))).unwrap();
    client.on_custom_command(("dup", recorder(&second))).unwrap();
    open(&mut client);

    invoke(&mut client, json!({"command": "dup"}));

    assert_eq!(first.lock().unwrap().len(), 1);
    assert!(second.lock().unwrap().is_empty());
}

#[test]
fn test_args_coerced_to_schema() {
    let calls: Calls = Arc::default();
    let (mut client, _wire) = client();
    client
        .on_custom_command(
            CustomCommand::new("search", recorder(&calls))
                .arg("query", ArgType::String)
                .arg("limit", ArgType::String),
        )
        .unwrap();
    open(&mut client);

    invoke(
        &mut client,
        json!({"command": "search", "args": {"query": "rust", "limit": 5, "extra": true}}),
    );

    let calls = calls.lock().unwrap();
    let args = calls[0].as_ref().unwrap();
    assert_eq!(args.get_str("query"), Some("rust"));
    assert_eq!(args.get_str("limit"), Some("5"));
    assert_eq!(args.get("extra"), None);
}

#[test]
fn test_handler_can_reply_through_client() {
    let (mut client, wire) = client();
    client
        .on_custom_command(("echo", |client: &mut Client, _: Option<CommandArgs>| {
            client.send("log", json!({"message": "echoed"}), false);
        }))
        .unwrap();
    open(&mut client);

    invoke(&mut client, json!({"command": "echo"}));

    let last = frames(&wire).pop().unwrap();
    assert_eq!(last["payload"]["message"], "echoed");
}

#[test]
fn test_blank_name_rejected() {
    let (mut client, _wire) = client();
    assert!(matches!(
        client.on_custom_command(("  ", noop)),
        Err(ClientError::InvalidCustomCommand(_))
    ));
    assert!(client.custom_commands().is_empty());
}

#[test]
fn test_unknown_command_ignored() {
    let (mut client, _wire) = client();
    open(&mut client);
    assert!(!client.dispatch_custom_command(&json!({"command": "missing"})));
    assert!(!client.dispatch_custom_command(&json!(42)));
}

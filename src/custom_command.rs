//! Remotely-invokable custom commands.
//!
//! Host code registers commands by name; the server lists them and can
//! trigger one by sending a `custom` command. Each registration gets an id
//! from a per-client counter that starts at 1 and never repeats.
//!
//! Inbound invocation payloads come in three shapes:
//!
//! ```text
//! "ping"                                  by name, no args
//! {"command": "ping", "args": {...}}      by name, with args
//! {"id": 3, "args": {...}}                by id, with args
//! ```
//!
//! The first matching entry in registration order handles the invocation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::client::Client;
use crate::error::ClientError;

/// Declared type of a custom command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    /// Free-form text.
    String,
}

/// One entry of a command's argument schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCommandArg {
    /// Argument name, used as the key in the argument bag.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub kind: ArgType,
}

/// Arguments delivered to a handler, already coerced to the declared schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArgs(Map<String, Value>);

impl CommandArgs {
    /// Raw value of an argument.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String value of an argument.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Number of arguments present.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no arguments are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Underlying JSON object.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Handler invoked when the server triggers a command.
pub type CustomCommandHandler = Arc<dyn Fn(&mut Client, Option<CommandArgs>) + Send + Sync>;

/// A command description as supplied by host code.
#[derive(Clone)]
pub struct CustomCommand {
    /// Name the server uses to trigger the command.
    pub command: String,
    /// Called on invocation.
    pub handler: CustomCommandHandler,
    /// Short label shown by the server.
    pub title: Option<String>,
    /// Longer explanation shown by the server.
    pub description: Option<String>,
    /// Argument schema, in display order.
    pub args: Vec<CustomCommandArg>,
}

impl fmt::Debug for CustomCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCommand")
            .field("command", &self.command)
            .field("title", &self.title)
            .field("description", &self.description)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl CustomCommand {
    /// Command with no metadata and no arguments.
    pub fn new<F>(command: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Client, Option<CommandArgs>) + Send + Sync + 'static,
    {
        Self {
            command: command.into(),
            handler: Arc::new(handler),
            title: None,
            description: None,
            args: Vec::new(),
        }
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append an argument to the schema.
    pub fn arg(mut self, name: impl Into<String>, kind: ArgType) -> Self {
        self.args.push(CustomCommandArg {
            name: name.into(),
            kind,
        });
        self
    }
}

/// `(name, handler)` shortcut.
impl<S, F> From<(S, F)> for CustomCommand
where
    S: Into<String>,
    F: Fn(&mut Client, Option<CommandArgs>) + Send + Sync + 'static,
{
    fn from((command, handler): (S, F)) -> Self {
        Self::new(command, handler)
    }
}

/// A stored registration.
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    /// Assigned id.
    pub id: u64,
    /// The registered command.
    pub command: CustomCommand,
}

impl RegisteredCommand {
    /// Payload for `customCommand.register`.
    pub fn descriptor(&self) -> Value {
        json!({
            "id": self.id,
            "command": self.command.command,
            "title": self.command.title,
            "description": self.command.description,
            "args": self.command.args,
        })
    }
}

/// Returned by registration; unregisters that exact entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomCommandHandle {
    id: u64,
    command: String,
}

impl CustomCommandHandle {
    /// Assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Command name.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Remove the registration from `client`. Repeated calls do nothing.
    ///
    /// Returns `true` if an entry was removed.
    pub fn unregister(&self, client: &mut Client) -> bool {
        client.remove_custom_command(self.id)
    }
}

/// How an invocation names its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandTarget {
    /// Match by command name.
    Name(String),
    /// Match by assigned id.
    Id(u64),
}

/// A decoded `custom` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Which command to run.
    pub target: CommandTarget,
    /// Raw argument bag, if any.
    pub args: Option<Map<String, Value>>,
}

impl Invocation {
    /// Decode an inbound `custom` payload. Returns `None` for unrecognized shapes.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        match payload {
            Value::String(name) => Some(Self {
                target: CommandTarget::Name(name.clone()),
                args: None,
            }),
            Value::Object(map) => {
                let target = if let Some(name) = map.get("command").and_then(Value::as_str) {
                    CommandTarget::Name(name.to_string())
                } else {
                    CommandTarget::Id(map.get("id").and_then(Value::as_u64)?)
                };
                let args = map.get("args").and_then(Value::as_object).cloned();
                Some(Self { target, args })
            }
            _ => None,
        }
    }
}

/// Coerce a raw argument bag against a command's schema.
///
/// With a schema, only declared arguments are kept and each is converted to
/// its declared type (`null` values are dropped). Without one, the bag is
/// passed through unchanged.
pub fn coerce_args(schema: &[CustomCommandArg], raw: Option<Map<String, Value>>) -> Option<CommandArgs> {
    let raw = raw?;
    if schema.is_empty() {
        return Some(CommandArgs(raw));
    }

    let mut coerced = Map::new();
    for declared in schema {
        let Some(value) = raw.get(&declared.name) else {
            continue;
        };
        let converted = match (declared.kind, value) {
            (_, Value::Null) => continue,
            (ArgType::String, Value::String(s)) => Value::String(s.clone()),
            (ArgType::String, other) => Value::String(other.to_string()),
        };
        coerced.insert(declared.name.clone(), converted);
    }
    Some(CommandArgs(coerced))
}

/// Per-client registry of custom commands.
#[derive(Debug)]
pub struct CustomCommandRegistry {
    entries: Vec<RegisteredCommand>,
    latest_id: u64,
}

impl Default for CustomCommandRegistry {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            latest_id: 1,
        }
    }
}

impl CustomCommandRegistry {
    /// Empty registry whose first id will be 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a command and assign it the next id.
    pub fn register(&mut self, command: CustomCommand) -> Result<&RegisteredCommand, ClientError> {
        if command.command.trim().is_empty() {
            return Err(ClientError::InvalidCustomCommand(
                "a command name is required".to_string(),
            ));
        }

        let id = self.latest_id;
        self.latest_id += 1;
        log::debug!("[CustomCommand] Registered '{}' as #{}", command.command, id);

        self.entries.push(RegisteredCommand { id, command });
        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    /// Remove the entry with `id`, if present.
    pub fn unregister(&mut self, id: u64) -> Option<RegisteredCommand> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    /// First entry matching `target`, in registration order.
    pub fn find(&self, target: &CommandTarget) -> Option<&RegisteredCommand> {
        self.entries.iter().find(|entry| match target {
            CommandTarget::Name(name) => entry.command.command == *name,
            CommandTarget::Id(id) => entry.id == *id,
        })
    }

    /// Registered entries in registration order.
    pub fn entries(&self) -> &[RegisteredCommand] {
        &self.entries
    }

    /// Id the next registration will receive.
    pub fn next_id(&self) -> u64 {
        self.latest_id
    }

    /// Resolve an inbound payload to a handler and its coerced arguments.
    pub fn resolve(&self, payload: &Value) -> Option<(CustomCommandHandler, Option<CommandArgs>)> {
        let Some(invocation) = Invocation::from_payload(payload) else {
            log::debug!("[CustomCommand] Unrecognized invocation payload: {}", payload);
            return None;
        };
        let Some(entry) = self.find(&invocation.target) else {
            log::debug!("[CustomCommand] No command matches {:?}", invocation.target);
            return None;
        };
        let args = coerce_args(&entry.command.args, invocation.args);
        Some((Arc::clone(&entry.command.handler), args))
    }

    pub(crate) fn handle_for(entry: &RegisteredCommand) -> CustomCommandHandle {
        CustomCommandHandle {
            id: entry.id,
            command: entry.command.command.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> CustomCommand {
        CustomCommand::new("noop", |_client, _args| {})
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut registry = CustomCommandRegistry::new();
        let ids: Vec<u64> = (0..4)
            .map(|_| registry.register(noop()).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_ids_not_reused_after_unregister() {
        let mut registry = CustomCommandRegistry::new();
        let first = registry.register(noop()).unwrap().id;
        assert!(registry.unregister(first).is_some());
        assert!(registry.unregister(first).is_none());

        let second = registry.register(noop()).unwrap().id;
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = CustomCommandRegistry::new();
        let err = registry
            .register(CustomCommand::new("  ", |_client, _args| {}))
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidCustomCommand(_)));
        assert_eq!(registry.next_id(), 1);
    }

    #[test]
    fn test_invocation_shapes() {
        assert_eq!(
            Invocation::from_payload(&json!("ping")).unwrap().target,
            CommandTarget::Name("ping".into())
        );

        let by_id = Invocation::from_payload(&json!({"id": 7, "args": {"a": "b"}})).unwrap();
        assert_eq!(by_id.target, CommandTarget::Id(7));
        assert_eq!(by_id.args.unwrap()["a"], "b");

        assert!(Invocation::from_payload(&json!({"args": {}})).is_none());
        assert!(Invocation::from_payload(&json!(42)).is_none());
    }

    #[test]
    fn test_coerce_against_schema() {
        let schema = vec![
            CustomCommandArg {
                name: "count".into(),
                kind: ArgType::String,
            },
            CustomCommandArg {
                name: "label".into(),
                kind: ArgType::String,
            },
            CustomCommandArg {
                name: "gone".into(),
                kind: ArgType::String,
            },
        ];
        let raw = json!({"count": 3, "label": "x", "gone": null, "extra": true});
        let args = coerce_args(&schema, raw.as_object().cloned()).unwrap();

        assert_eq!(args.get_str("count"), Some("3"));
        assert_eq!(args.get_str("label"), Some("x"));
        assert!(args.get("gone").is_none());
        assert!(args.get("extra").is_none());
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_coerce_without_schema_passes_through() {
        let raw = json!({"n": 1});
        let args = coerce_args(&[], raw.as_object().cloned()).unwrap();
        assert_eq!(args.get("n"), Some(&json!(1)));
        assert!(coerce_args(&[], None).is_none());
    }

    #[test]
    fn test_find_prefers_first_registration() {
        let mut registry = CustomCommandRegistry::new();
        registry
            .register(CustomCommand::new("dup", |_client, _args| {}).title("first"))
            .unwrap();
        registry
            .register(CustomCommand::new("dup", |_client, _args| {}).title("second"))
            .unwrap();

        let found = registry.find(&CommandTarget::Name("dup".into())).unwrap();
        assert_eq!(found.command.title.as_deref(), Some("first"));
    }

    #[test]
    fn test_descriptor_shape() {
        let mut registry = CustomCommandRegistry::new();
        let entry = registry
            .register(
                CustomCommand::new("reset", |_client, _args| {})
                    .title("Reset")
                    .description("Reset the store")
                    .arg("scope", ArgType::String),
            )
            .unwrap();

        assert_eq!(
            entry.descriptor(),
            json!({
                "id": 1,
                "command": "reset",
                "title": "Reset",
                "description": "Reset the store",
                "args": [{"name": "scope", "type": "string"}],
            })
        );
    }
}

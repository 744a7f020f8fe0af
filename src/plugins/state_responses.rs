//! Replies to the server's state inspection requests.
//!
//! State management integrations use these to answer `state.*` requests and
//! to push subscribed changes. The plugin only shapes and sends the
//! messages; reading the host's state is up to the integration.

use serde_json::{json, Value};

use crate::client::Client;
use crate::command::command_type;
use crate::error::ClientError;
use crate::plugin::{arg, arg_flag, arg_str, creator, Features, Plugin, PluginCreator};

/// State responses plugin.
#[derive(Debug, Default)]
pub struct StateResponsesPlugin;

/// Creator for [`StateResponsesPlugin`].
pub fn state_responses() -> PluginCreator {
    creator(|_client| StateResponsesPlugin)
}

/// `valid` defaults to true when the caller leaves it out.
fn valid_flag(args: &[Value], index: usize) -> bool {
    match arg(args, index) {
        Value::Null => true,
        _ => arg_flag(args, index),
    }
}

impl Plugin for StateResponsesPlugin {
    fn name(&self) -> &str {
        "state_responses"
    }

    fn features(&self) -> Features {
        Features::new()
            .with("stateActionComplete", |client, args| {
                let name = arg_str("stateActionComplete", args, 0)?;
                client.send(
                    command_type::STATE_ACTION_COMPLETE,
                    json!({ "name": name, "action": arg(args, 1) }),
                    arg_flag(args, 2),
                );
                Ok(Value::Null)
            })
            .with("stateValuesResponse", |client, args| {
                let path = arg_str("stateValuesResponse", args, 0)?;
                client.send(
                    command_type::STATE_VALUES_RESPONSE,
                    json!({ "path": path, "value": arg(args, 1), "valid": valid_flag(args, 2) }),
                    false,
                );
                Ok(Value::Null)
            })
            .with("stateKeysResponse", |client, args| {
                let path = arg_str("stateKeysResponse", args, 0)?;
                client.send(
                    command_type::STATE_KEYS_RESPONSE,
                    json!({ "path": path, "keys": arg(args, 1), "valid": valid_flag(args, 2) }),
                    false,
                );
                Ok(Value::Null)
            })
            .with("stateValuesChange", |client, args| {
                let changes = arg(args, 0);
                if changes.as_array().is_some_and(|list| !list.is_empty()) {
                    client.send(
                        command_type::STATE_VALUES_CHANGE,
                        json!({ "changes": changes }),
                        false,
                    );
                }
                Ok(Value::Null)
            })
            .with("stateBackupResponse", |client, args| {
                client.send(
                    command_type::STATE_BACKUP_RESPONSE,
                    json!({ "state": arg(args, 0) }),
                    false,
                );
                Ok(Value::Null)
            })
    }
}

/// A changed state path.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    /// Dotted path into the state tree.
    pub path: String,
    /// New value at that path.
    pub value: Value,
}

/// Typed access to the state response features.
pub trait StateResponses {
    /// An action finished.
    fn state_action_complete(&mut self, name: &str, action: Value, important: bool) -> Result<(), ClientError>;
    /// Value at `path`.
    fn state_values_response(&mut self, path: &str, value: Value, valid: bool) -> Result<(), ClientError>;
    /// Keys under `path`.
    fn state_keys_response(&mut self, path: &str, keys: &[String], valid: bool) -> Result<(), ClientError>;
    /// Subscribed paths changed. Sends nothing for an empty list.
    fn state_values_change(&mut self, changes: &[StateChange]) -> Result<(), ClientError>;
    /// Full state snapshot.
    fn state_backup_response(&mut self, state: Value) -> Result<(), ClientError>;
}

impl StateResponses for Client {
    fn state_action_complete(&mut self, name: &str, action: Value, important: bool) -> Result<(), ClientError> {
        self.call_feature("stateActionComplete", &[json!(name), action, json!(important)])
            .map(drop)
    }

    fn state_values_response(&mut self, path: &str, value: Value, valid: bool) -> Result<(), ClientError> {
        self.call_feature("stateValuesResponse", &[json!(path), value, json!(valid)])
            .map(drop)
    }

    fn state_keys_response(&mut self, path: &str, keys: &[String], valid: bool) -> Result<(), ClientError> {
        self.call_feature("stateKeysResponse", &[json!(path), json!(keys), json!(valid)])
            .map(drop)
    }

    fn state_values_change(&mut self, changes: &[StateChange]) -> Result<(), ClientError> {
        let changes: Vec<Value> = changes
            .iter()
            .map(|change| json!({ "path": change.path, "value": change.value }))
            .collect();
        self.call_feature("stateValuesChange", &[Value::Array(changes)])
            .map(drop)
    }

    fn state_backup_response(&mut self, state: Value) -> Result<(), ClientError> {
        self.call_feature("stateBackupResponse", &[state]).map(drop)
    }
}

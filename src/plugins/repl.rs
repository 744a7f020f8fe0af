//! Named values the server can browse.
//!
//! Host code registers JSON values under a name with the `repl` feature.
//! The server then lists them (`repl.ls.request`), selects one
//! (`repl.cd.request`) and reads into it by dotted path
//! (`repl.execute.request`, e.g. `settings.theme.0`). Nothing is evaluated;
//! execute only walks the selected value.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Value};

use crate::client::Client;
use crate::command::{command_type, Command};
use crate::error::ClientError;
use crate::plugin::{arg, arg_str, Features, Plugin, PluginCreator};

#[derive(Debug, Default)]
struct ReplState {
    values: BTreeMap<String, Value>,
    current: Option<String>,
}

/// REPL plugin.
#[derive(Debug, Default)]
pub struct ReplPlugin {
    state: Arc<Mutex<ReplState>>,
}

/// Creator for [`ReplPlugin`]. Each install gets its own set of values.
pub fn repl() -> PluginCreator {
    Arc::new(|_client: &Client| Arc::new(ReplPlugin::default()) as Arc<dyn Plugin>)
}

/// Walk `path` (dot separated, array indexes as numbers) into `root`.
fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

impl ReplPlugin {
    fn lock(&self) -> std::sync::MutexGuard<'_, ReplState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn change_directory(&self, name: &str) -> Value {
        let mut state = self.lock();
        if state.values.contains_key(name) {
            state.current = Some(name.to_string());
            json!(format!("Changed to {name}"))
        } else {
            json!("That REPL does not exist")
        }
    }

    fn execute(&self, path: &str) -> Value {
        let state = self.lock();
        let Some(current) = state.current.as_ref() else {
            return json!("You must first select the REPL to use. Try 'ls'");
        };
        let Some(root) = state.values.get(current) else {
            return json!("That REPL does not exist");
        };
        match resolve_path(root, path) {
            Some(value) => value.clone(),
            None => json!(format!("'{path}' is undefined in {current}")),
        }
    }
}

impl Plugin for ReplPlugin {
    fn name(&self) -> &str {
        "repl"
    }

    fn features(&self) -> Features {
        let state = Arc::clone(&self.state);
        Features::new().with("repl", move |_client, args| {
            let name = arg_str("repl", args, 0)?;
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.values.contains_key(name) {
                return Err(ClientError::Repl(format!(
                    "you are already REPLing an item with the name '{name}'"
                )));
            }
            state.values.insert(name.to_string(), arg(args, 1).clone());
            Ok(Value::Null)
        })
    }

    fn on_command(&self, client: &mut Client, command: &Command) {
        let reply = match command.kind.as_str() {
            command_type::REPL_LS_REQUEST => {
                let names: Vec<String> = self.lock().values.keys().cloned().collect();
                Some((command_type::REPL_LS_RESPONSE, json!(names)))
            }
            command_type::REPL_CD_REQUEST => {
                let name = command.payload.as_str().unwrap_or_default();
                Some((command_type::REPL_CD_RESPONSE, self.change_directory(name)))
            }
            command_type::REPL_EXECUTE_REQUEST => {
                let path = command.payload.as_str().unwrap_or_default();
                Some((command_type::REPL_EXECUTE_RESPONSE, self.execute(path)))
            }
            _ => None,
        };

        if let Some((kind, payload)) = reply {
            client.send(kind, payload, false);
        }
    }
}

/// Typed access to the repl feature.
pub trait Repl {
    /// Expose `value` under `name`. Names must be unique per client.
    fn repl(&mut self, name: &str, value: Value) -> Result<(), ClientError>;
}

impl Repl for Client {
    fn repl(&mut self, name: &str, value: Value) -> Result<(), ClientError> {
        self.call_feature("repl", &[json!(name), value]).map(drop)
    }
}

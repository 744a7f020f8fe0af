//! Plugin protocol and feature merging.
//!
//! A plugin is any type implementing [`Plugin`]; every member has a no-op
//! default, so a plugin only overrides the capabilities it has. Plugins are
//! produced by a [`PluginCreator`] that receives the client at install time.
//!
//! Features are named callables a plugin contributes. The client keeps them
//! in a [`FeatureRegistry`] rather than growing new methods: callers look a
//! feature up by name (`Client::call_feature`) or go through one of the typed
//! extension traits in [`crate::plugins`], which do the same lookup. When two
//! plugins declare the same name the later one wins.
//!
//! # Example
//!
//! ```ignore
//! struct Greeter;
//!
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str { "greeter" }
//!
//!     fn features(&self) -> Features {
//!         Features::new().with("greet", |client, args| {
//!             client.send("log", json!({"level": "debug", "message": args}), false);
//!             Ok(Value::Null)
//!         })
//!     }
//! }
//!
//! client.use_plugin(|_client| Greeter)?;
//! client.call_feature("greet", &[json!("hello")])?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::client::Client;
use crate::command::Command;
use crate::error::ClientError;

/// Names that belong to the facade itself and may not be used as features.
pub const RESERVED_FEATURES: &[&str] = &[
    "options",
    "connected",
    "socket",
    "plugins",
    "configure",
    "connect",
    "send",
    "use",
    "start_timer",
    "startTimer",
];

/// A named callable contributed by a plugin.
pub type Feature = Arc<dyn Fn(&mut Client, &[Value]) -> Result<Value, ClientError> + Send + Sync>;

/// Produces a plugin for a client. Invoked once per install.
pub type PluginCreator = Arc<dyn Fn(&Client) -> Arc<dyn Plugin> + Send + Sync>;

/// Wrap a plugin constructor into a [`PluginCreator`].
pub fn creator<F, P>(build: F) -> PluginCreator
where
    F: Fn(&Client) -> P + Send + Sync + 'static,
    P: Plugin + 'static,
{
    Arc::new(move |client: &Client| Arc::new(build(client)) as Arc<dyn Plugin>)
}

/// Capability set a plugin may provide.
///
/// Hooks receive the client mutably so they can send messages or register
/// commands. Hooks fire in plugin registration order.
pub trait Plugin: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Features to merge into the client's registry.
    fn features(&self) -> Features {
        Features::default()
    }

    /// Called once, right after the plugin is installed.
    fn on_plugin(&self, _client: &mut Client) {}

    /// Called for every inbound command.
    fn on_command(&self, _client: &mut Client, _command: &Command) {}

    /// Called when the socket opens.
    fn on_connect(&self, _client: &mut Client) {}

    /// Called when the socket closes or fails.
    fn on_disconnect(&self, _client: &mut Client) {}
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name()).finish()
    }
}

/// Ordered feature declarations of one plugin.
#[derive(Clone, Default)]
pub struct Features {
    entries: Vec<(String, Feature)>,
}

impl fmt::Debug for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}

impl Features {
    /// Empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a feature.
    pub fn with<F>(mut self, name: impl Into<String>, feature: F) -> Self
    where
        F: Fn(&mut Client, &[Value]) -> Result<Value, ClientError> + Send + Sync + 'static,
    {
        self.entries.push((name.into(), Arc::new(feature)));
        self
    }

    /// Declared names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The client's name → feature mapping.
#[derive(Default)]
pub struct FeatureRegistry {
    features: HashMap<String, (Feature, String)>,
}

impl fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl FeatureRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a plugin's features, replacing same-named entries.
    ///
    /// All names are checked before anything is installed, so a rejected
    /// declaration leaves the registry untouched.
    pub fn install(&mut self, features: Features, plugin: &str) -> Result<(), ClientError> {
        if let Some(reserved) = features
            .names()
            .find(|name| RESERVED_FEATURES.contains(name))
        {
            return Err(ClientError::ReservedFeature(reserved.to_string()));
        }

        for (name, feature) in features.entries {
            if let Some((_, previous)) = self
                .features
                .insert(name.clone(), (feature, plugin.to_string()))
            {
                log::debug!(
                    "[Plugins] Feature '{}' from '{}' replaced by '{}'",
                    name,
                    previous,
                    plugin
                );
            }
        }
        Ok(())
    }

    /// Current implementation of `name`.
    pub fn get(&self, name: &str) -> Option<Feature> {
        self.features.get(name).map(|(feature, _)| Arc::clone(feature))
    }

    /// Name of the plugin that currently provides `name`.
    pub fn provider(&self, name: &str) -> Option<&str> {
        self.features.get(name).map(|(_, plugin)| plugin.as_str())
    }

    /// Returns `true` if `name` is installed.
    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// Installed names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.features.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

static NULL: Value = Value::Null;

/// Positional feature argument, `null` when absent.
pub fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

/// Positional string argument.
pub fn arg_str<'a>(feature: &str, args: &'a [Value], index: usize) -> Result<&'a str, ClientError> {
    arg(args, index)
        .as_str()
        .ok_or_else(|| ClientError::InvalidFeatureArgs {
            feature: feature.to_string(),
            reason: format!("argument {index} must be a string"),
        })
}

/// Positional boolean argument using JavaScript-style truthiness, `false` when absent.
pub fn arg_flag(args: &[Value], index: usize) -> bool {
    match arg(args, index) {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

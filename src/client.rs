//! The client facade.
//!
//! [`Client`] composes option validation, the plugin registry, the custom
//! command registry and the [`Connection`] into the one object host code
//! talks to. It is driven entirely by `&mut self` calls: host code calls
//! `send`/`display`/features directly, and whatever owns the socket feeds
//! socket events in through [`Client::handle_event`].
//!
//! # Lifecycle
//!
//! ```text
//! create_client(options)       validate, install plugins
//!   .connect()                 socket factory invoked, state Connecting
//! SocketEvent::Open            on_connect hooks, Ready, intro, flush queue,
//!                              announce custom commands
//! SocketEvent::Message(..)     on_command hooks, custom command dispatch
//! SocketEvent::Close           on_disconnect hooks, back to Idle
//! close()                      socket released, queue dropped, Closed
//! ```

// Rust guideline compliant 2026-02

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::command::{self, command_type, Command};
use crate::connection::{server_url, Connection, ConnectionState, SocketEvent};
use crate::custom_command::{
    CustomCommand, CustomCommandHandle, CustomCommandRegistry, RegisteredCommand,
};
use crate::error::ClientError;
use crate::options::{validate, ClientOptions};
use crate::plugin::{FeatureRegistry, Plugin, PluginCreator};
use crate::timer::{Clock, MonotonicClock, Stopwatch};

/// Intro field carrying the client library version.
const CORE_VERSION_FIELD: &str = "reactotronCoreClientVersion";

/// Receives internal faults (malformed frames, transport errors).
pub type ErrorReporter = Arc<dyn Fn(&ClientError) + Send + Sync>;

/// A named value for the server to display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayConfig {
    /// Heading.
    pub name: String,
    /// Value to show.
    pub value: Option<Value>,
    /// One-line summary.
    pub preview: Option<String>,
    /// Image URI to show alongside.
    pub image: Option<String>,
    /// Ask the server to highlight this entry.
    pub important: bool,
}

impl DisplayConfig {
    /// Display with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the value.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the preview line.
    pub fn preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    /// Set the image URI.
    pub fn image(mut self, uri: impl Into<String>) -> Self {
        self.image = Some(uri.into());
        self
    }

    /// Mark as important.
    pub fn important(mut self) -> Self {
        self.important = true;
        self
    }

    fn payload(&self) -> Value {
        json!({
            "name": self.name,
            "value": self.value,
            "preview": self.preview,
            "image": self.image.as_ref().map(|uri| json!({ "uri": uri })),
        })
    }
}

/// Create and configure a client. Does not connect.
pub fn create_client(options: ClientOptions) -> Result<Client, ClientError> {
    let mut client = Client::new();
    client.configure(options)?;
    Ok(client)
}

/// Connection to an inspection server plus the features plugins installed.
pub struct Client {
    options: ClientOptions,
    connection: Connection,
    connected: bool,
    plugins: Vec<Arc<dyn Plugin>>,
    features: FeatureRegistry,
    custom_commands: CustomCommandRegistry,
    last_message_date: DateTime<Utc>,
    client_id: Option<String>,
    clock: Arc<dyn Clock>,
    error_reporter: ErrorReporter,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.connection.state())
            .field("connected", &self.connected)
            .field("plugins", &self.plugins)
            .field("features", &self.features)
            .field("custom_commands", &self.custom_commands.entries().len())
            .field("queued", &self.connection.queued())
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Unconfigured client using the monotonic system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    /// Unconfigured client reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            options: ClientOptions {
                plugins: Vec::new(),
                ..ClientOptions::default()
            },
            connection: Connection::new(),
            connected: false,
            plugins: Vec::new(),
            features: FeatureRegistry::new(),
            custom_commands: CustomCommandRegistry::new(),
            last_message_date: Utc::now(),
            client_id: None,
            clock,
            error_reporter: Arc::new(|error: &ClientError| {
                log::error!("[Client] {}", error);
            }),
        }
    }

    /// Validate and store options, then install their plugins in order.
    ///
    /// Previously installed plugins and features are discarded. On error the
    /// client is left exactly as it was. Does not connect.
    pub fn configure(&mut self, options: ClientOptions) -> Result<&mut Self, ClientError> {
        validate(&options)?;

        let mut plugins = Vec::with_capacity(options.plugins.len());
        let mut features = FeatureRegistry::new();
        for creator in &options.plugins {
            let plugin = creator(&*self);
            features.install(plugin.features(), plugin.name())?;
            plugins.push(plugin);
        }

        self.client_id.clone_from(&options.client_id);
        self.options = options;
        self.features = features;
        self.plugins.clear();
        for plugin in plugins {
            self.attach(plugin);
        }
        Ok(self)
    }

    /// Install a plugin built by `create`.
    ///
    /// Features are merged (later plugins win on name collisions), the plugin
    /// is appended to the hook order and its `on_plugin` hook runs. A plugin
    /// installed after the socket opened does not get `on_connect`.
    pub fn use_plugin<F, P>(&mut self, create: F) -> Result<&mut Self, ClientError>
    where
        F: FnOnce(&Client) -> P,
        P: Plugin + 'static,
    {
        let plugin: Arc<dyn Plugin> = Arc::new(create(&*self));
        self.install(plugin)?;
        Ok(self)
    }

    /// Install a plugin from a shared creator.
    pub fn use_creator(&mut self, creator: &PluginCreator) -> Result<&mut Self, ClientError> {
        let plugin = creator(&*self);
        self.install(plugin)?;
        Ok(self)
    }

    fn install(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), ClientError> {
        self.features.install(plugin.features(), plugin.name())?;
        self.attach(plugin);
        Ok(())
    }

    /// Append to the hook order and run `on_plugin`. Features must already be merged.
    fn attach(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(Arc::clone(&plugin));
        log::debug!("[Plugins] Installed '{}'", plugin.name());
        plugin.on_plugin(self);
    }

    /// Open the socket. Only valid while idle.
    pub fn connect(&mut self) -> Result<&mut Self, ClientError> {
        let factory = self
            .options
            .create_socket
            .clone()
            .ok_or(ClientError::InvalidSocketFactory)?;
        let port = self.options.port_u16()?;
        let url = server_url(&self.options.host, port, self.options.secure);
        self.connection.open(&factory, &url)?;
        Ok(self)
    }

    /// Tear down immediately: close the socket and drop queued messages.
    ///
    /// Later `send` calls are accepted but never written.
    pub fn close(&mut self) {
        let was_live = matches!(
            self.connection.state(),
            ConnectionState::Connecting | ConnectionState::Ready
        );
        self.connection.close();
        self.connected = false;
        log::info!("[Client] Closed");
        if was_live {
            self.fire_disconnect();
        }
    }

    /// Send a command, or queue it until the socket is ready.
    ///
    /// `important` is passed through for the server; it does not reorder
    /// anything locally.
    pub fn send(&mut self, kind: &str, payload: Value, important: bool) {
        let now = Utc::now();
        match command::encode(kind, &payload, important, self.last_message_date, now) {
            Ok(frame) => {
                self.last_message_date = now;
                log::trace!("[Client] -> {}", kind);
                self.connection.write_or_queue(frame);
            }
            Err(e) => self.report_error(&e),
        }
    }

    /// Send a `display` command.
    pub fn display(&mut self, config: DisplayConfig) {
        self.send(command_type::DISPLAY, config.payload(), config.important);
    }

    /// Register a command the server can trigger.
    ///
    /// Accepts a full [`CustomCommand`] or a `(name, handler)` pair. When the
    /// socket is already ready the command is announced right away; otherwise
    /// it is announced after the next open.
    pub fn on_custom_command(
        &mut self,
        command: impl Into<CustomCommand>,
    ) -> Result<CustomCommandHandle, ClientError> {
        let entry = self.custom_commands.register(command.into())?;
        let handle = CustomCommandRegistry::handle_for(entry);
        let descriptor = entry.descriptor();

        if self.is_ready() {
            self.send(command_type::CUSTOM_COMMAND_REGISTER, descriptor, false);
        }
        Ok(handle)
    }

    /// Remove a custom command by id. Returns `false` if it was already gone.
    pub fn remove_custom_command(&mut self, id: u64) -> bool {
        let Some(entry) = self.custom_commands.unregister(id) else {
            return false;
        };
        self.send(
            command_type::CUSTOM_COMMAND_UNREGISTER,
            json!({ "id": entry.id, "command": entry.command.command }),
            false,
        );
        true
    }

    /// Invoke an installed feature by name.
    pub fn call_feature(&mut self, name: &str, args: &[Value]) -> Result<Value, ClientError> {
        let feature = self
            .features
            .get(name)
            .ok_or_else(|| ClientError::FeatureNotInstalled(name.to_string()))?;
        feature(self, args)
    }

    /// Returns `true` if some plugin provides `name`.
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.contains(name)
    }

    /// Installed feature names, sorted.
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.names()
    }

    /// Name of the plugin currently providing `name`.
    pub fn feature_provider(&self, name: &str) -> Option<&str> {
        self.features.provider(name)
    }

    /// Feed one socket event into the client.
    pub fn handle_event(&mut self, event: SocketEvent) {
        if self.connection.state() == ConnectionState::Closed {
            log::debug!("[Client] Ignoring {:?} after close", event);
            return;
        }
        match event {
            SocketEvent::Open => self.handle_open(),
            SocketEvent::Message(frame) => self.handle_message(&frame),
            SocketEvent::Error(reason) => {
                self.report_error(&ClientError::Transport(reason));
                self.handle_close();
            }
            SocketEvent::Close => self.handle_close(),
        }
    }

    fn handle_open(&mut self) {
        if self.connection.state() != ConnectionState::Connecting {
            log::debug!(
                "[Client] Ignoring open while {}",
                self.connection.state()
            );
            return;
        }

        self.connected = true;
        log::info!("[Client] Connected");

        // Hooks run before the connection is ready, so anything they send
        // lands behind messages queued earlier.
        if let Some(on_connect) = self.options.on_connect.clone() {
            on_connect();
        }
        for plugin in self.plugins.clone() {
            plugin.on_connect(self);
        }

        if !self.connection.mark_ready() {
            return;
        }

        self.send_intro();
        self.connection.flush();

        let descriptors: Vec<Value> = self
            .custom_commands
            .entries()
            .iter()
            .map(RegisteredCommand::descriptor)
            .collect();
        for descriptor in descriptors {
            self.send(command_type::CUSTOM_COMMAND_REGISTER, descriptor, false);
        }
    }

    fn send_intro(&mut self) {
        let mut intro = Map::new();
        intro.insert("environment".into(), json!(self.options.environment));
        for (key, value) in &self.options.client_info {
            intro.insert(key.clone(), value.clone());
        }
        intro.insert("name".into(), json!(self.options.name));
        intro.insert("clientId".into(), json!(self.client_id));
        intro.insert(
            CORE_VERSION_FIELD.into(),
            json!(env!("CARGO_PKG_VERSION")),
        );
        self.send(command_type::CLIENT_INTRO, Value::Object(intro), false);
    }

    fn handle_message(&mut self, frame: &str) {
        let command = match Command::parse(frame) {
            Ok(command) => command,
            Err(e) => {
                self.report_error(&e);
                return;
            }
        };
        log::trace!("[Client] <- {}", command.kind);

        if command.is(command_type::SET_CLIENT_ID) {
            if let Some(id) = command.payload.as_str() {
                self.client_id = Some(id.to_string());
                if let Some(on_client_id) = self.options.on_client_id.clone() {
                    on_client_id(id);
                }
            }
        }

        if let Some(on_command) = self.options.on_command.clone() {
            on_command(&command);
        }
        for plugin in self.plugins.clone() {
            plugin.on_command(self, &command);
        }

        if command.is(command_type::CUSTOM) {
            self.dispatch_custom_command(&command.payload);
        }
    }

    /// Run the custom command an inbound `custom` payload names.
    ///
    /// Returns `false` if nothing matched.
    pub fn dispatch_custom_command(&mut self, payload: &Value) -> bool {
        let Some((handler, args)) = self.custom_commands.resolve(payload) else {
            return false;
        };
        handler(self, args);
        true
    }

    fn handle_close(&mut self) {
        if !self.connection.disconnected() {
            return;
        }
        self.connected = false;
        log::info!("[Client] Disconnected");
        self.fire_disconnect();
    }

    fn fire_disconnect(&mut self) {
        if let Some(on_disconnect) = self.options.on_disconnect.clone() {
            on_disconnect();
        }
        for plugin in self.plugins.clone() {
            plugin.on_disconnect(self);
        }
    }

    /// Replace the error reporter.
    pub fn set_error_reporter<F>(&mut self, reporter: F)
    where
        F: Fn(&ClientError) + Send + Sync + 'static,
    {
        self.error_reporter = Arc::new(reporter);
    }

    /// Hand an internal fault to the error reporter.
    pub fn report_error(&self, error: &ClientError) {
        (self.error_reporter)(error);
    }

    /// Start a timer on this client's clock.
    pub fn start_timer(&self) -> Stopwatch {
        Stopwatch::start(Arc::clone(&self.clock))
    }

    /// Current options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Returns `true` between the open and close events.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns `true` when sends are written straight to the socket.
    pub fn is_ready(&self) -> bool {
        self.connection.state() == ConnectionState::Ready
    }

    /// Number of messages waiting for the socket.
    pub fn queued(&self) -> usize {
        self.connection.queued()
    }

    /// Id assigned by the server, if any.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Installed plugins in hook order.
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Registered custom commands in registration order.
    pub fn custom_commands(&self) -> &[RegisteredCommand] {
        self.custom_commands.entries()
    }

    /// Timestamp of the most recent `send`.
    pub fn last_message_date(&self) -> DateTime<Utc> {
        self.last_message_date
    }
}

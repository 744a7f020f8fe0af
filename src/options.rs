//! Client options and their validation.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::command::Command;
use crate::connection::{Socket, SocketFactory};
use crate::env::Environment;
use crate::error::ClientError;
use crate::plugin::PluginCreator;
use crate::plugins;

/// Default server port.
pub const DEFAULT_PORT: u32 = 9090;

/// Default server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Root handler for every inbound command.
pub type CommandHandler = Arc<dyn Fn(&Command) + Send + Sync>;

/// Root connect/disconnect hook.
pub type LifecycleHandler = Arc<dyn Fn() + Send + Sync>;

/// Receives the id the server assigns to this client.
pub type ClientIdHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Configuration for a client.
///
/// Construct with [`ClientOptions::default`] and override fields, then hand
/// to `create_client` or `Client::configure`, which validate before storing.
#[derive(Clone)]
pub struct ClientOptions {
    /// Builds the socket when `connect()` is called.
    pub create_socket: Option<SocketFactory>,
    /// Server host name.
    pub host: String,
    /// Server port, `1..=65535`.
    pub port: u32,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
    /// Client name shown by the server.
    pub name: String,
    /// Environment label shown by the server.
    pub environment: String,
    /// Extra fields merged into the intro message.
    pub client_info: Map<String, Value>,
    /// Id previously assigned by the server.
    pub client_id: Option<String>,
    /// Called when the server assigns an id.
    pub on_client_id: Option<ClientIdHandler>,
    /// Called for every inbound command, before plugin hooks.
    pub on_command: Option<CommandHandler>,
    /// Called when the socket opens, before plugin hooks.
    pub on_connect: Option<LifecycleHandler>,
    /// Called when the socket closes, before plugin hooks.
    pub on_disconnect: Option<LifecycleHandler>,
    /// Plugins installed by `configure`, in order.
    pub plugins: Vec<PluginCreator>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            create_socket: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            secure: false,
            name: env!("CARGO_PKG_NAME").to_string(),
            environment: Environment::current().to_string(),
            client_info: Map::new(),
            client_id: None,
            on_client_id: None,
            on_command: Some(Arc::new(|_command: &Command| {})),
            on_connect: None,
            on_disconnect: None,
            plugins: plugins::core_plugins(),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("create_socket", &self.create_socket.is_some())
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("name", &self.name)
            .field("environment", &self.environment)
            .field("client_info", &self.client_info)
            .field("client_id", &self.client_id)
            .field("on_command", &self.on_command.is_some())
            .field("plugins", &self.plugins.len())
            .finish_non_exhaustive()
    }
}

impl ClientOptions {
    /// Set the socket factory.
    pub fn with_socket<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Result<Box<dyn Socket>, ClientError> + Send + Sync + 'static,
    {
        self.create_socket = Some(Arc::new(factory));
        self
    }

    /// Set the root command handler.
    pub fn with_on_command<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Command) + Send + Sync + 'static,
    {
        self.on_command = Some(Arc::new(handler));
        self
    }

    /// Replace the plugin list.
    pub fn with_plugins(mut self, plugins: Vec<PluginCreator>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Validated port as `u16`.
    pub(crate) fn port_u16(&self) -> Result<u16, ClientError> {
        u16::try_from(self.port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or(ClientError::InvalidPort(self.port))
    }
}

/// Reject malformed options before any connection attempt.
///
/// Checks run in order and the first failure is returned: socket factory,
/// host, port, command handler.
pub fn validate(options: &ClientOptions) -> Result<(), ClientError> {
    if options.create_socket.is_none() {
        return Err(ClientError::InvalidSocketFactory);
    }
    if options.host.is_empty() {
        return Err(ClientError::InvalidHost);
    }
    options.port_u16()?;
    if options.on_command.is_none() {
        return Err(ClientError::InvalidCommandHandler);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSocket;

    impl Socket for NullSocket {
        fn send(&mut self, _frame: &str) {}
        fn close(&mut self) {}
    }

    fn valid() -> ClientOptions {
        ClientOptions::default().with_socket(|_url| Ok(Box::new(NullSocket) as Box<dyn Socket>))
    }

    #[test]
    fn test_valid_options_pass() {
        assert!(validate(&valid()).is_ok());
    }

    #[test]
    fn test_missing_socket_factory() {
        let options = ClientOptions::default();
        assert!(matches!(
            validate(&options),
            Err(ClientError::InvalidSocketFactory)
        ));
    }

    #[test]
    fn test_empty_host() {
        let mut options = valid();
        options.host = String::new();
        assert!(matches!(validate(&options), Err(ClientError::InvalidHost)));
    }

    #[test]
    fn test_port_bounds() {
        for port in [0, 65536, 70000] {
            let mut options = valid();
            options.port = port;
            assert!(
                matches!(validate(&options), Err(ClientError::InvalidPort(p)) if p == port),
                "port {port} should be rejected"
            );
        }
        for port in [1, 65535] {
            let mut options = valid();
            options.port = port;
            assert!(validate(&options).is_ok(), "port {port} should be accepted");
        }
    }

    #[test]
    fn test_missing_command_handler() {
        let mut options = valid();
        options.on_command = None;
        assert!(matches!(
            validate(&options),
            Err(ClientError::InvalidCommandHandler)
        ));
    }

    #[test]
    fn test_checks_run_in_order() {
        let options = ClientOptions {
            host: String::new(),
            port: 0,
            on_command: None,
            ..ClientOptions::default()
        };
        assert!(matches!(
            validate(&options),
            Err(ClientError::InvalidSocketFactory)
        ));
    }
}

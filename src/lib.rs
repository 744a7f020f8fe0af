//! devlink - stream diagnostics from a running process to an inspection server.
//!
//! A [`Client`] holds one WebSocket-style connection to a desktop inspection
//! server. Host code logs, displays values, reports timings and registers
//! commands the server can trigger; the server can also query state and
//! browse values exposed through the REPL plugin.
//!
//! # Architecture
//!
//! - **Client** - facade; owns options, plugins, features and the connection
//! - **Connection** - socket ownership, state machine, outbound FIFO queue
//! - **Plugins** - contribute named features and lifecycle hooks
//! - **Custom commands** - server-triggered callbacks with argument schemas
//! - **ws** - tokio-tungstenite transport feeding socket events back in
//!
//! The core never does I/O itself. A [`SocketFactory`] builds the socket and
//! whatever owns it feeds [`SocketEvent`]s to [`Client::handle_event`]; that
//! keeps the core testable with an in-memory socket.
//!
//! # Example
//!
//! ```ignore
//! use devlink::{create_client, ClientOptions, Logging, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::new();
//! let mut options = ClientOptions::default();
//! options.create_socket = Some(transport.socket_factory());
//!
//! let mut client = create_client(options)?;
//! client.log("booting")?; // queued until the socket opens
//! client.connect()?;
//! transport.run_until_closed(&mut client).await;
//! ```

// Rust guideline compliant 2026-02

pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod custom_command;
pub mod env;
pub mod error;
pub mod options;
pub mod plugin;
pub mod plugins;
pub mod timer;
pub mod ws;

pub use client::{create_client, Client, DisplayConfig, ErrorReporter};
pub use command::{command_type, Command};
pub use config::Config;
pub use connection::{ConnectionState, Socket, SocketEvent, SocketFactory};
pub use custom_command::{ArgType, CommandArgs, CustomCommand, CustomCommandHandle};
pub use env::Environment;
pub use error::ClientError;
pub use options::ClientOptions;
pub use plugin::{Feature, Features, Plugin, PluginCreator};
pub use plugins::{
    ApiResponses, Benchmarking, Clearing, ImagePayload, Images, Logging, Repl, StateResponses,
};
pub use ws::WebSocketTransport;

//! Socket ownership, connection state machine and the outbound queue.
//!
//! # State machine
//!
//! ```text
//!   Idle ──open()──► Connecting ──mark_ready()──► Ready
//!    ▲                   │                          │
//!    └──── disconnected()┴──────────────────────────┘
//!
//!   any state ──close()──► Closed (terminal)
//! ```
//!
//! Frames written while the connection is not `Ready` are appended to a FIFO
//! queue and flushed, one write per frame, once the client marks the
//! connection ready. The queue is unbounded and `Connecting` has no timeout;
//! a socket that never opens keeps frames buffered until `close()`.

// Rust guideline compliant 2026-02

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::error::ClientError;

/// A duplex text socket supplied by the host environment.
///
/// Implementations deliver their open/message/error/close events back to the
/// client as [`SocketEvent`]s through `Client::handle_event`.
pub trait Socket: Send {
    /// Write one text frame.
    fn send(&mut self, frame: &str);

    /// Release the socket. Must tolerate repeated calls.
    fn close(&mut self);
}

/// Builds a socket for a `ws://` or `wss://` URL.
pub type SocketFactory = Arc<dyn Fn(&str) -> Result<Box<dyn Socket>, ClientError> + Send + Sync>;

/// Event emitted by a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The socket is open and writable.
    Open,
    /// A text frame arrived.
    Message(String),
    /// The socket failed; a `Close` may or may not follow.
    Error(String),
    /// The socket is gone.
    Close,
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Constructed or disconnected; `connect()` is allowed.
    #[default]
    Idle,
    /// Socket created, waiting for its open event.
    Connecting,
    /// Open; writes go straight to the socket.
    Ready,
    /// Torn down by `close()`.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Ready => write!(f, "ready"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Build the server URL from host, port and scheme choice.
#[must_use]
pub fn server_url(host: &str, port: u16, secure: bool) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    format!("{scheme}://{host}:{port}")
}

/// Owns the socket handle and the pending-frame queue.
#[derive(Default)]
pub struct Connection {
    state: ConnectionState,
    socket: Option<Box<dyn Socket>>,
    queue: VecDeque<String>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("has_socket", &self.socket.is_some())
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl Connection {
    /// Create an idle connection with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of frames waiting for the socket to become ready.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Frames waiting for the socket, oldest first.
    pub fn queued_frames(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    /// Create the socket and move to `Connecting`.
    ///
    /// Only valid from `Idle`; the state is unchanged if the factory fails.
    pub fn open(&mut self, factory: &SocketFactory, url: &str) -> Result<(), ClientError> {
        if self.state != ConnectionState::Idle {
            return Err(ClientError::NotIdle(self.state));
        }
        let socket = factory(url)?;
        log::info!("[Connection] Connecting to {}", url);
        self.socket = Some(socket);
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Move `Connecting` to `Ready`. Returns `false` from any other state.
    pub fn mark_ready(&mut self) -> bool {
        if self.state != ConnectionState::Connecting {
            return false;
        }
        self.state = ConnectionState::Ready;
        true
    }

    /// Write queued frames in FIFO order and empty the queue.
    ///
    /// Returns the number of frames written. Does nothing unless `Ready`.
    pub fn flush(&mut self) -> usize {
        if self.state != ConnectionState::Ready {
            return 0;
        }
        let Some(socket) = self.socket.as_mut() else {
            return 0;
        };
        let count = self.queue.len();
        while let Some(frame) = self.queue.pop_front() {
            socket.send(&frame);
        }
        if count > 0 {
            log::debug!("[Connection] Flushed {} queued frame(s)", count);
        }
        count
    }

    /// Write immediately when `Ready`, otherwise append to the queue.
    ///
    /// After `close()` frames are still appended but never written.
    pub fn write_or_queue(&mut self, frame: String) {
        match (self.state, self.socket.as_mut()) {
            (ConnectionState::Ready, Some(socket)) => socket.send(&frame),
            _ => self.queue.push_back(frame),
        }
    }

    /// Handle the socket going away: release it and return to `Idle`.
    ///
    /// Returns `true` if the connection was live (`Connecting` or `Ready`).
    /// Queued frames are kept for a later `connect()`.
    pub fn disconnected(&mut self) -> bool {
        if !matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Ready
        ) {
            return false;
        }
        self.socket = None;
        self.state = ConnectionState::Idle;
        true
    }

    /// Tear down from any state: close the socket, drop queued frames, enter `Closed`.
    pub fn close(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        let dropped = self.queue.len();
        self.queue.clear();
        if dropped > 0 {
            log::debug!("[Connection] Discarded {} queued frame(s) on close", dropped);
        }
        self.state = ConnectionState::Closed;
    }
}

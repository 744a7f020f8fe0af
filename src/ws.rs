//! WebSocket transport for the client.
//!
//! The client core is sans-IO: it asks a [`SocketFactory`] for a socket and
//! expects [`SocketEvent`]s back through `Client::handle_event`. This module
//! supplies both halves on top of `tokio-tungstenite`.
//!
//! # Architecture
//!
//! ```text
//! Client::connect() ──► factory ──spawn──► socket task ◄──► server
//!       ▲                  │                   │
//!       │            WebSocket (outbound mpsc) │ (socket id, SocketEvent)
//!       │                                      ▼
//!       └── handle_event ◄── WebSocketTransport::next_event()
//! ```
//!
//! Each `connect()` spawns one task that owns the stream. Outbound frames go
//! through an unbounded channel so `Socket::send` never blocks, and are
//! written in the order they were sent. Events are tagged with the id of the
//! socket that produced them; only the newest socket's events are delivered,
//! so a late `Close` from a replaced socket cannot tear down its successor.

// Rust guideline compliant 2026-02

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;

use crate::client::Client;
use crate::connection::{ConnectionState, Socket, SocketEvent, SocketFactory};
use crate::error::ClientError;

/// Handshake deadline for a new socket.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Frame received from the server.
#[derive(Debug)]
enum WsMessage {
    Text(String),
    Ping(Vec<u8>),
    Close { code: u16, reason: String },
}

/// Write half of a WebSocket connection.
#[derive(Debug)]
struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Text(text.to_string()))
            .await
            .context("WebSocket send_text failed")
    }

    async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .context("WebSocket send_pong failed")
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await.context("WebSocket close failed")
    }
}

/// Read half of a WebSocket connection.
#[derive(Debug)]
struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Next text, ping or close frame; `None` when the stream ends.
    async fn recv(&mut self) -> Option<Result<WsMessage>> {
        loop {
            match self.stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    return Some(Ok(WsMessage::Text(text.to_string())));
                }
                Some(Ok(tungstenite::Message::Ping(data))) => {
                    return Some(Ok(WsMessage::Ping(data.to_vec())));
                }
                Some(Ok(tungstenite::Message::Close(close_frame))) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    return Some(Ok(WsMessage::Close { code, reason }));
                }
                Some(Ok(tungstenite::Message::Binary(_))) => {
                    log::debug!("[WebSocket] Ignoring binary frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Some(Err(anyhow::anyhow!("WebSocket read error: {e}")));
                }
                None => return None,
            }
        }
    }
}

/// Perform the handshake and split the stream.
async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    use tungstenite::client::IntoClientRequest;

    let request = url
        .into_client_request()
        .with_context(|| format!("invalid WebSocket URL: {url}"))?;

    let (ws_stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(request))
        .await
        .with_context(|| format!("WebSocket connect timed out after {}s", CONNECT_TIMEOUT.as_secs()))?
        .context("WebSocket connect failed")?;

    let (sink, stream) = ws_stream.split();
    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Work for the socket task.
#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// Client-side handle to a socket task.
#[derive(Debug)]
struct WebSocket {
    id: u64,
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Socket for WebSocket {
    fn send(&mut self, frame: &str) {
        if self.outbound.send(Outbound::Frame(frame.to_string())).is_err() {
            log::debug!("[WebSocket] Socket {} task gone, dropping frame", self.id);
        }
    }

    fn close(&mut self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Where a socket task reports its events.
#[derive(Debug, Clone)]
struct EventSink {
    id: u64,
    tx: mpsc::UnboundedSender<(u64, SocketEvent)>,
}

impl EventSink {
    fn emit(&self, event: SocketEvent) {
        let _ = self.tx.send((self.id, event));
    }
}

/// Socket task: connect, then shuttle frames both ways until either side ends.
///
/// Always finishes with a `Close` event.
async fn run_socket(url: String, mut outbound: mpsc::UnboundedReceiver<Outbound>, events: EventSink) {
    log::info!("[WebSocket] Connecting to {}", url);

    let (mut writer, mut reader) = match connect(&url).await {
        Ok(pair) => {
            log::info!("[WebSocket] Connected");
            pair
        }
        Err(e) => {
            log::warn!("[WebSocket] Connection failed: {:#}", e);
            events.emit(SocketEvent::Error(format!("{e:#}")));
            events.emit(SocketEvent::Close);
            return;
        }
    };

    events.emit(SocketEvent::Open);

    loop {
        tokio::select! {
            msg = reader.recv() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => events.emit(SocketEvent::Message(text)),
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = writer.send_pong(data).await;
                    }
                    Some(Ok(WsMessage::Close { code, reason })) => {
                        log::info!("[WebSocket] Closed by server ({} {})", code, reason);
                        break;
                    }
                    Some(Err(e)) => {
                        log::warn!("[WebSocket] {}", e);
                        events.emit(SocketEvent::Error(e.to_string()));
                        break;
                    }
                    None => {
                        log::info!("[WebSocket] Stream ended");
                        break;
                    }
                }
            }

            request = outbound.recv() => {
                match request {
                    Some(Outbound::Frame(frame)) => {
                        if let Err(e) = writer.send_text(&frame).await {
                            log::warn!("[WebSocket] {}", e);
                            events.emit(SocketEvent::Error(e.to_string()));
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => {
                        log::debug!("[WebSocket] Closing socket {}", events.id);
                        let _ = writer.close().await;
                        break;
                    }
                }
            }
        }
    }

    events.emit(SocketEvent::Close);
}

/// Owns the event channel shared by every socket the factory creates.
pub struct WebSocketTransport {
    events_tx: mpsc::UnboundedSender<(u64, SocketEvent)>,
    events_rx: mpsc::UnboundedReceiver<(u64, SocketEvent)>,
    latest: Arc<AtomicU64>,
}

impl fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("latest", &self.latest.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketTransport {
    /// Create a transport with no sockets yet.
    #[must_use]
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            events_tx,
            events_rx,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Factory for `ClientOptions::create_socket`.
    ///
    /// Must be invoked inside a tokio runtime; outside one it fails with
    /// [`ClientError::SocketFactory`].
    pub fn socket_factory(&self) -> SocketFactory {
        let tx = self.events_tx.clone();
        let latest = Arc::clone(&self.latest);

        Arc::new(move |url: &str| {
            let handle = tokio::runtime::Handle::try_current()
                .map_err(|e| ClientError::SocketFactory(e.to_string()))?;

            let id = latest.fetch_add(1, Ordering::SeqCst) + 1;
            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let sink = EventSink { id, tx: tx.clone() };
            handle.spawn(run_socket(url.to_string(), outbound_rx, sink));

            Ok(Box::new(WebSocket {
                id,
                outbound: outbound_tx,
            }) as Box<dyn Socket>)
        })
    }

    /// Next event from the newest socket. Events from replaced sockets are
    /// dropped.
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        loop {
            let (id, event) = self.events_rx.recv().await?;
            if id == self.latest.load(Ordering::SeqCst) {
                return Some(event);
            }
            log::debug!("[WebSocket] Dropping {:?} from replaced socket {}", event, id);
        }
    }

    /// Feed events to `client` until it is ready or the attempt fails.
    ///
    /// Returns `true` if the client ended up ready.
    pub async fn run_until_ready(&mut self, client: &mut Client) -> bool {
        while client.state() == ConnectionState::Connecting {
            let Some(event) = self.next_event().await else {
                break;
            };
            client.handle_event(event);
        }
        client.is_ready()
    }

    /// Feed events to `client` for as long as its socket is live.
    pub async fn run_until_closed(&mut self, client: &mut Client) {
        while matches!(
            client.state(),
            ConnectionState::Connecting | ConnectionState::Ready
        ) {
            let Some(event) = self.next_event().await else {
                break;
            };
            client.handle_event(event);
        }
    }

    /// Wait up to `timeout` for the newest socket to report `Close`.
    ///
    /// Used after `Client::close()` so frames already handed to the socket
    /// task are written before the process exits.
    pub async fn wait_for_close(&mut self, timeout: Duration) -> bool {
        let wait = async {
            while let Some(event) = self.next_event().await {
                if event == SocketEvent::Close {
                    return true;
                }
            }
            false
        };
        tokio::time::timeout(timeout, wait).await.unwrap_or(false)
    }
}

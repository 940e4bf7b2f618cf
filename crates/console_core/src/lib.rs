use std::sync::Arc;

use futures::{stream::SplitSink, SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    sync::{broadcast, Mutex},
};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsFrame, MaybeTlsStream, WebSocketStream,
};
use tracing::{info, warn};
use url::Url;

pub mod dispatch;
pub mod transcript;
pub mod types;

pub use transcript::TranscriptView;
pub use types::{ConnectionState, Message, MessageKind};

const CONNECTED_NOTICE: &str = "Connected to WebSocket server";
const DISCONNECTED_NOTICE: &str = "Disconnected from WebSocket server";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, WsFrame>;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid server url '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported scheme '{scheme}' in server url (expected http or https)")]
    UnsupportedScheme { scheme: String },
    #[error("server url '{url}' has no host")]
    MissingHost { url: String },
}

/// Derives the WebSocket endpoint from the server base url:
/// `{ws|wss}://{host[:port]}/ws`, `wss` iff the base url is `https`.
pub fn ws_endpoint(server_url: &str) -> Result<String, EndpointError> {
    let parsed = Url::parse(server_url).map_err(|source| EndpointError::Parse {
        url: server_url.to_string(),
        source,
    })?;
    let scheme = match parsed.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(EndpointError::UnsupportedScheme {
                scheme: other.to_string(),
            })
        }
    };
    let host = parsed.host_str().ok_or_else(|| EndpointError::MissingHost {
        url: server_url.to_string(),
    })?;
    Ok(match parsed.port() {
        Some(port) => format!("{scheme}://{host}:{port}/ws"),
        None => format!("{scheme}://{host}/ws"),
    })
}

/// Events broadcast by the controller: transcript entries to append and
/// state changes driving the status indicator and send controls.
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    Transcript(Message),
    StateChanged(ConnectionState),
}

struct ControllerState {
    state: ConnectionState,
    writer: Option<WsWriter>,
    generation: u64,
}

/// Owns the single WebSocket connection and its lifecycle state machine.
///
/// Each connect attempt carries a generation; transport events from a
/// superseded attempt are ignored, so a stale close can never clobber the
/// state of a newer connection.
pub struct ConsoleClient {
    endpoint: String,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<ConsoleEvent>,
}

impl ConsoleClient {
    pub fn new(server_url: impl AsRef<str>) -> Result<Arc<Self>, EndpointError> {
        let endpoint = ws_endpoint(server_url.as_ref())?;
        let (events, _) = broadcast::channel(1024);
        Ok(Arc::new(Self {
            endpoint,
            inner: Mutex::new(ControllerState {
                state: ConnectionState::Disconnected,
                writer: None,
                generation: 0,
            }),
            events,
        }))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// The single connect/disconnect control. Connected with a live write
    /// half: requests the close handshake and leaves `Disconnected` to the
    /// subsequent close event. Otherwise: starts a fresh connect attempt
    /// under a new generation.
    pub async fn toggle(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        if inner.state == ConnectionState::Connected && inner.writer.is_some() {
            if let Some(mut writer) = inner.writer.take() {
                if let Err(error) = writer.close().await {
                    warn!(%error, "ws: close request failed");
                }
            }
            return;
        }

        inner.generation += 1;
        let generation = inner.generation;
        inner.state = ConnectionState::Connecting;
        drop(inner);

        self.emit_state(ConnectionState::Connecting);
        let client = Arc::clone(self);
        tokio::spawn(async move {
            client.run_connection(generation).await;
        });
    }

    /// Transmits `text` as one text frame and records the sent entry.
    /// Silently a no-op unless connected with a live write half and the
    /// text is non-empty after trimming.
    pub async fn send(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let mut inner = self.inner.lock().await;
        if inner.state != ConnectionState::Connected {
            return;
        }
        let Some(writer) = inner.writer.as_mut() else {
            // close already requested; the handle is no longer writable
            return;
        };
        if let Err(error) = writer.send(WsFrame::Text(text.to_string())).await {
            drop(inner);
            warn!(%error, "ws: send failed");
            self.emit_transcript(Message::error(format!("Error: {error}")));
            return;
        }
        drop(inner);
        self.emit_transcript(dispatch::send(text));
    }

    async fn run_connection(self: Arc<Self>, generation: u64) {
        info!(endpoint = %self.endpoint, "ws: connecting");
        let stream = match connect_async(&self.endpoint).await {
            Ok((stream, _response)) => stream,
            Err(error) => {
                // a failed attempt surfaces as an error entry followed by
                // the close transition, the same as a remote drop
                self.on_error(generation, &error.to_string()).await;
                self.on_close(generation).await;
                return;
            }
        };

        let (writer, mut reader) = stream.split();
        if !self.on_open(generation, writer).await {
            return;
        }

        while let Some(frame) = reader.next().await {
            match frame {
                Ok(WsFrame::Text(raw)) => self.on_message(generation, &raw).await,
                Ok(WsFrame::Close(_)) => break,
                Ok(_) => {} // binary and control frames are outside the console's contract
                Err(error) => {
                    self.on_error(generation, &error.to_string()).await;
                    break;
                }
            }
        }

        self.on_close(generation).await;
    }

    /// Open transition. Pre: the handshake for `generation` completed.
    /// Post: `Connected` with the write half installed, or `false` when the
    /// attempt was superseded and the stream must be dropped.
    async fn on_open(&self, generation: u64, writer: WsWriter) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return false;
        }
        inner.writer = Some(writer);
        inner.state = ConnectionState::Connected;
        drop(inner);

        info!("ws: connection established");
        self.emit_state(ConnectionState::Connected);
        self.emit_transcript(Message::system(CONNECTED_NOTICE));
        true
    }

    /// Close transition, terminal for one connection attempt. Fires for
    /// user-initiated and transport-initiated closure alike.
    /// Post: `Disconnected` with no write half.
    async fn on_close(&self, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return;
        }
        inner.writer = None;
        inner.state = ConnectionState::Disconnected;
        drop(inner);

        info!("ws: connection closed");
        self.emit_state(ConnectionState::Disconnected);
        self.emit_transcript(Message::system(DISCONNECTED_NOTICE));
    }

    /// Error transition. Does not change connection state; a close
    /// transition typically follows from the read loop ending.
    async fn on_error(&self, generation: u64, description: &str) {
        let inner = self.inner.lock().await;
        if inner.generation != generation {
            return;
        }
        drop(inner);

        warn!(error = %description, "ws: transport error");
        self.emit_transcript(Message::error(format!("Error: {description}")));
    }

    /// Message transition: classify the inbound frame and append the entry.
    async fn on_message(&self, generation: u64, raw: &str) {
        let inner = self.inner.lock().await;
        if inner.generation != generation {
            return;
        }
        drop(inner);

        self.emit_transcript(dispatch::receive(raw));
    }

    fn emit_state(&self, state: ConnectionState) {
        let _ = self.events.send(ConsoleEvent::StateChanged(state));
    }

    fn emit_transcript(&self, message: Message) {
        let _ = self.events.send(ConsoleEvent::Transcript(message));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

//! Socket transport.
//!
//! The driver talks to the server through [`Transport`], a text-frame pipe,
//! and obtains one per connection attempt from a [`Connector`]. The
//! production pair is [`WsConnector`] / [`WsTransport`] over
//! `tokio-tungstenite`.

use crate::BotConfig;
use async_trait::async_trait;
use derive_more::{Display, Error};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, instrument, trace, warn};

/// Path and query of the game socket endpoint.
const SOCKET_PATH: &str = "/socket.io/?EIO=4&transport=websocket";

/// A bidirectional text-frame connection.
#[async_trait]
pub trait Transport: Send {
    /// Sends one text frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Waits for the next text frame. `None` means the peer closed.
    ///
    /// Must be cancel-safe; the driver races it against its timers.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection type produced.
    type Transport: Transport;

    /// Opens a new connection.
    async fn connect(&self) -> Result<Self::Transport, TransportError>;
}

/// Derives the socket URL from the service base URL.
pub fn socket_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}{SOCKET_PATH}")
}

/// Opens WebSocket connections to the game server.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    origin: String,
    user_agent: String,
    timeout: Duration,
}

impl WsConnector {
    /// Creates a connector for an explicit socket URL.
    pub fn new(
        url: impl Into<String>,
        origin: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            origin: origin.into(),
            user_agent: user_agent.into(),
            timeout,
        }
    }

    /// Creates a connector from configuration.
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(
            socket_url(config.base_url()),
            config.origin().clone(),
            config.socket_user_agent().clone(),
            config.connect_timeout(),
        )
    }

    /// Socket URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&self) -> Result<WsTransport, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::new(format!("Invalid socket URL: {}", e)))?;

        let headers = request.headers_mut();
        headers.insert(
            header::ORIGIN,
            HeaderValue::from_str(&self.origin)
                .map_err(|e| TransportError::new(format!("Invalid Origin header: {}", e)))?,
        );
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| TransportError::new(format!("Invalid User-Agent header: {}", e)))?,
        );

        debug!("Opening socket");
        let (stream, response) =
            tokio::time::timeout(self.timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| TransportError::new("Timeout opening socket"))?
                .map_err(|e| TransportError::new(format!("Socket connect failed: {}", e)))?;

        info!(status = %response.status(), "Socket open");
        Ok(WsTransport { stream })
    }
}

/// WebSocket-backed [`Transport`].
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|e| TransportError::new(format!("Failed to send frame: {}", e)))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Peer closed socket");
                    return None;
                }
                Ok(other) => {
                    trace!(kind = ?other, "Ignoring non-text message");
                }
                Err(e) => {
                    warn!(error = %e, "Socket read failed");
                    return Some(Err(TransportError::new(format!("Socket read failed: {}", e))));
                }
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError::new(format!("Failed to close socket: {}", e)))
    }
}

/// Transport error.
#[derive(Debug, Clone, Display, Error)]
#[display("Transport error: {} at {}:{}", message, file, line)]
pub struct TransportError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl TransportError {
    /// Creates a new transport error.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

//! WebSocket plumbing using `tokio-tungstenite`.
//!
//! [`WsListener`] accepts connections; [`WsConnection`] is one open socket,
//! used both by server handler tasks and by [`RelayClient`](crate::RelayClient).

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding or accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    Accept(#[source] std::io::Error),

    /// The WebSocket upgrade or connect handshake failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    Send(#[source] tungstenite::Error),

    /// Receiving a frame failed.
    #[error("receive failed: {0}")]
    Receive(#[source] tungstenite::Error),

    /// The peer closed the connection while we were waiting for a reply.
    #[error("connection closed: {0}")]
    Closed(String),
}

/// Opaque identifier for a connection, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Accepts WebSocket connections on a TCP port.
pub struct WsListener {
    listener: TcpListener,
}

impl WsListener {
    /// Binds to `addr`. Use port 0 for an ephemeral port.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await.map_err(TransportError::Accept)?;
        tracing::info!(addr, "websocket listener bound");
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next client and completes the WebSocket upgrade.
    pub async fn accept(&self) -> Result<WsConnection<TcpStream>, TransportError> {
        let (stream, addr) = self.listener.accept().await.map_err(TransportError::Accept)?;
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(TransportError::Handshake)?;

        let conn = WsConnection::new(ws);
        tracing::debug!(id = %conn.id(), %addr, "accepted websocket connection");
        Ok(conn)
    }
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// One WebSocket. `send` and `recv` take `&self`; the stream sits behind a
/// mutex.
pub struct WsConnection<S> {
    id: ConnectionId,
    ws: Mutex<WebSocketStream<S>>,
}

impl<S> WsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(ws: WebSocketStream<S>) -> Self {
        Self {
            id: ConnectionId::next(),
            ws: Mutex::new(ws),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Sends one text frame. Frames are JSON, so text keeps them readable
    /// in browser tools.
    pub async fn send(&self, data: Vec<u8>) -> Result<(), TransportError> {
        let msg = match String::from_utf8(data) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => Message::Binary(e.into_bytes().into()),
        };
        self.ws
            .lock()
            .await
            .send(msg)
            .await
            .map_err(TransportError::Send)
    }

    /// Receives the next data frame.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    pub async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            let msg = self.ws.lock().await.next().await;
            match msg {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => return Err(TransportError::Receive(e)),
            }
        }
    }

    pub async fn close(&self) -> Result<(), TransportError> {
        self.ws
            .lock()
            .await
            .close(None)
            .await
            .map_err(TransportError::Send)
    }
}

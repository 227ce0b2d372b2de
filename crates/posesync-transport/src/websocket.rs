//! WebSocket client binding using `tokio-tungstenite`.
//!
//! `connect` spawns a driver task that performs the handshake, then keeps
//! reading frames and forwarding them as [`TransportEvent`]s. The write half
//! lives behind a mutex so the foreground and the sync task can both send.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{
    Connection, ConnectionId, ConnectionStatus, Connector, Delivery, Link,
    TransportError, TransportEvent,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Write half of the socket as seen by senders.
enum SinkSlot {
    /// Handshake still in flight.
    Pending,
    Open(WsSink),
    Closed,
}

/// A [`Connector`] that dials `ws://host:port/<path>`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    path: String,
}

impl WebSocketConnector {
    /// Creates a connector that dials the server root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request path appended to the URL (e.g. `"/session"`).
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// Builds the URL for a host/port pair, bracketing bare IPv6 literals.
fn ws_url(host: &str, port: u16, path: &str) -> Result<String, TransportError> {
    let host = host.trim();
    if host.is_empty() || host.contains('/') {
        return Err(TransportError::InvalidAddress(host.to_string()));
    }
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    let path = if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Ok(format!("ws://{host}:{port}{path}"))
}

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;

    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Link<Self::Connection>, TransportError> {
        let url = ws_url(host, port, &self.path)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| TransportError::NoRuntime)?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(Mutex::new(SinkSlot::Pending));

        tracing::info!(%id, %url, "connecting to server");
        let driver = runtime.spawn(drive(id, url, Arc::clone(&sink), events_tx));

        Ok(Link::new(WebSocketConnection { id, sink, driver }, events_rx))
    }
}

/// Performs the handshake, then pumps inbound frames until the socket ends.
async fn drive(
    id: ConnectionId,
    url: String,
    sink: Arc<Mutex<SinkSlot>>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let ws = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(e) => {
            tracing::warn!(%id, %url, error = %e, "websocket connect failed");
            let _ = events.send(TransportEvent::Status(
                ConnectionStatus::ProblemDetectedLocally,
            ));
            return;
        }
    };

    let (write, mut read) = ws.split();
    {
        let mut slot = sink.lock().await;
        if matches!(*slot, SinkSlot::Closed) {
            // Closed locally while the handshake was in flight.
            return;
        }
        *slot = SinkSlot::Open(write);
    }

    tracing::debug!(%id, "websocket connected");
    if events
        .send(TransportEvent::Status(ConnectionStatus::Connected))
        .is_err()
    {
        return;
    }

    let status = loop {
        match read.next().await {
            Some(Ok(Message::Binary(data))) => {
                if events.send(TransportEvent::Message(data.into())).is_err() {
                    return;
                }
            }
            Some(Ok(Message::Text(text))) => {
                let bytes = text.as_bytes().to_vec();
                if events.send(TransportEvent::Message(bytes)).is_err() {
                    return;
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                break ConnectionStatus::ClosedByPeer;
            }
            Some(Ok(_)) => continue, // ping/pong/raw frame
            Some(Err(e)) => {
                tracing::debug!(%id, error = %e, "websocket read failed");
                break ConnectionStatus::ProblemDetectedLocally;
            }
        }
    };

    *sink.lock().await = SinkSlot::Closed;
    tracing::debug!(%id, %status, "websocket reader finished");
    let _ = events.send(TransportEvent::Status(status));
}

/// A client WebSocket connection to the game server.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Arc<Mutex<SinkSlot>>,
    driver: JoinHandle<()>,
}

impl Connection for WebSocketConnection {
    async fn send(
        &self,
        data: &[u8],
        delivery: Delivery,
    ) -> Result<(), TransportError> {
        let mut slot = self.sink.lock().await;
        match &mut *slot {
            SinkSlot::Pending => Err(TransportError::NotConnected),
            SinkSlot::Closed => Err(TransportError::ConnectionClosed(
                format!("{} is closed", self.id),
            )),
            SinkSlot::Open(sink) => {
                tracing::trace!(id = %self.id, len = data.len(), ?delivery, "sending");
                let msg = Message::Binary(data.to_vec().into());
                sink.send(msg).await.map_err(|e| {
                    TransportError::SendFailed(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        e,
                    ))
                })
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let previous = {
            let mut slot = self.sink.lock().await;
            std::mem::replace(&mut *slot, SinkSlot::Closed)
        };
        self.driver.abort();

        if let SinkSlot::Open(mut sink) = previous {
            tracing::debug!(id = %self.id, "closing websocket");
            sink.close().await.map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })?;
        }
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

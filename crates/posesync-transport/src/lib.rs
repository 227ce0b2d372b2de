//! Client transport binding for posesync.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over the
//! message-oriented transport the session layer talks to, plus the event
//! types a binding produces.
//!
//! A binding is split in two halves on purpose:
//!
//! - the [`Connection`] (shared, `Arc`) is the *send* half. Both the
//!   foreground dispatch loop and the background sync task hold it.
//! - the event receiver in [`Link`] is the *receive* half. Exactly one owner
//!   (the foreground) drains it, so inbound frames and status changes arrive
//!   in the order the transport observed them.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Opaque identifier for a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Delivery guarantee requested for a single send.
///
/// High-frequency pose data goes out unreliable; one-off payloads such as
/// appearance data go out reliable. Transports without an unreliable
/// channel deliver both reliably.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Delivered in order, no loss.
    Reliable,
    /// May be lost or reordered.
    #[default]
    Unreliable,
}

/// Connection status reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    /// Nothing to report.
    None,
    /// The connection to the server is established.
    Connected,
    /// The server closed the connection.
    ClosedByPeer,
    /// The connection attempt failed or the link broke on our side.
    ProblemDetectedLocally,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Connected => "connected",
            Self::ClosedByPeer => "closed by peer",
            Self::ProblemDetectedLocally => "problem detected locally",
        };
        f.write_str(name)
    }
}

/// Something the transport observed, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection status changed.
    Status(ConnectionStatus),
    /// A complete inbound message.
    Message(Vec<u8>),
}

/// The send half of a connection.
///
/// Implementations must be safe to call `send` concurrently from several
/// tasks; the WebSocket implementation serializes sends behind a mutex.
pub trait Connection: Send + Sync + 'static {
    /// Sends one message with the requested delivery guarantee.
    fn send(
        &self,
        data: &[u8],
        delivery: Delivery,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the connection. After this returns every `send` fails.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the identifier of this connection.
    fn id(&self) -> ConnectionId;
}

/// Opens connections to a server.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Starts connecting to `host:port` and returns immediately.
    ///
    /// The outcome of the attempt is reported later on the link's event
    /// channel as [`ConnectionStatus::Connected`] or
    /// [`ConnectionStatus::ProblemDetectedLocally`].
    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Link<Self::Connection>, TransportError>;
}

/// Both halves of a freshly started connection.
pub struct Link<C> {
    /// Send half, shared between the foreground and the sync task.
    pub connection: Arc<C>,
    /// Receive half: status changes and inbound messages.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl<C> Link<C> {
    /// Bundles a connection with its event receiver.
    pub fn new(
        connection: C,
        events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> Self {
        Self {
            connection: Arc::new(connection),
            events,
        }
    }
}

impl<C> fmt::Debug for Link<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

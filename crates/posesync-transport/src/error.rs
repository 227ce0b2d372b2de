/// Errors that can occur in the transport binding.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A send was attempted before the connection was established.
    #[error("connection not established yet")]
    NotConnected,

    /// The connection was closed, locally or by the server.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// The server address could not be turned into a connect target.
    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    /// `connect` was called outside of a Tokio runtime.
    #[error("no async runtime available to drive the connection")]
    NoRuntime,
}

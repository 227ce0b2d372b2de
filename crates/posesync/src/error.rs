//! Unified error type for posesync.

use posesync_protocol::{CodecError, ProtocolError};
use posesync_session::SessionError;
use posesync_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// `#[from]` on each variant lets `?` convert layer errors directly.
#[derive(Debug, thiserror::Error)]
pub enum PosesyncError {
    /// Connecting or sending failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A pose payload could not be compressed or inflated.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A client operation was not allowed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The debug log file could not be opened.
    #[error("debug log: {0}")]
    Log(#[source] std::io::Error),
}

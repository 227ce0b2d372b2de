//! Error types for the session layer.

use posesync_protocol::{CodecError, OpCode};
use posesync_transport::TransportError;

use crate::SessionStatus;

/// Errors returned by [`Client`](crate::Client) operations.
///
/// Inbound problems (bad frames, unknown peers, corrupt payloads) never show
/// up here; they are dropped and logged during dispatch.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation is not allowed in the current status.
    #[error("cannot {operation} while {status}")]
    InvalidState {
        operation: &'static str,
        status: SessionStatus,
    },

    /// The opcode is owned by the session itself and cannot be sent by hand.
    #[error("{0} is sent by the session, not by callers")]
    ReservedOpcode(OpCode),

    /// The transport rejected the request.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A payload could not be compressed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

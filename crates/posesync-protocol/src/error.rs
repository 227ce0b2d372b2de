//! Error types for the protocol layer.
//!
//! Framing problems and compression problems are kept apart: a
//! [`ProtocolError`] means the bytes did not form a valid envelope, a
//! [`CodecError`] means the envelope was fine but its compressed body was
//! not. Both are "drop this message" conditions for the receiver.

/// Errors produced while framing or unframing messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// An inbound frame is shorter than `opcode + sender id`.
    #[error("frame too short: {len} bytes (need at least {min})")]
    FrameTooShort {
        /// Actual frame length.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// The opcode byte is not part of the protocol.
    #[error("unknown opcode {0}")]
    UnknownOpcode(u8),

    /// A typed payload is shorter than its fixed header.
    #[error("{kind} payload truncated: {len} bytes (need at least {min})")]
    PayloadTruncated {
        /// Which message kind was being decoded.
        kind: &'static str,
        /// Actual payload length.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },
}

/// Errors produced by [`decompress`](crate::decompress) and
/// [`compress`](crate::compress).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The compressed stream is not valid DEFLATE data.
    #[error("corrupt compressed payload: {0}")]
    Corrupt(#[from] flate2::DecompressError),

    /// The compressed stream ended before its final block.
    #[error("compressed payload truncated after {consumed} bytes")]
    Truncated {
        /// Input bytes consumed before running out.
        consumed: usize,
    },

    /// Inflating would exceed the configured output cap.
    #[error("decompressed payload exceeds {limit} bytes")]
    TooLarge {
        /// The cap that was hit.
        limit: usize,
    },

    /// The compressor itself failed.
    #[error("compression failed: {0}")]
    Compress(#[source] std::io::Error),
}

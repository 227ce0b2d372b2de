//! Envelope framing.
//!
//! The two directions are framed differently:
//!
//! ```text
//! outbound (client → server):  [opcode:1][payload:N]
//! inbound  (server → client):  [opcode:1][payload:N-2][sender:1]
//! ```
//!
//! The client never attaches its own id. The server knows who sent a message
//! and appends the sender's [`PeerId`] when relaying it to everyone else, so
//! only the receive path has to deal with the trailing byte.

use std::fmt;

use crate::{OpCode, ProtocolError};

/// Minimum inbound frame length: opcode plus sender id.
pub const MIN_INBOUND_LEN: usize = 2;

/// Server-assigned one-byte participant id.
///
/// Unique among the peers connected at one instant; the server may hand an
/// id out again after its previous owner disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u8);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Frames an outbound message: opcode followed by the payload, nothing else.
pub fn encode_outbound(opcode: OpCode, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(1 + payload.len());
    frame.push(opcode.as_u8());
    frame.extend_from_slice(payload);
    frame
}

/// A validated view of one inbound frame.
///
/// Construction checks the length; the accessors never panic afterwards.
/// The opcode is kept as a raw byte so unknown kinds can still be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundFrame<'a> {
    frame: &'a [u8],
}

impl<'a> InboundFrame<'a> {
    /// Validates the minimum length of a relayed frame.
    pub fn parse(frame: &'a [u8]) -> Result<Self, ProtocolError> {
        if frame.len() < MIN_INBOUND_LEN {
            return Err(ProtocolError::FrameTooShort {
                len: frame.len(),
                min: MIN_INBOUND_LEN,
            });
        }
        Ok(Self { frame })
    }

    /// The raw opcode byte.
    pub fn opcode_byte(&self) -> u8 {
        self.frame[0]
    }

    /// The opcode, if it belongs to the protocol.
    pub fn opcode(&self) -> Result<OpCode, ProtocolError> {
        OpCode::try_from(self.opcode_byte())
    }

    /// The id the server appended for the original sender.
    pub fn sender(&self) -> PeerId {
        PeerId(self.frame[self.frame.len() - 1])
    }

    /// Bytes strictly between the opcode and the sender id.
    pub fn payload(&self) -> &'a [u8] {
        &self.frame[1..self.frame.len() - 1]
    }

    /// Everything after the opcode, sender byte included.
    ///
    /// Used for message kinds whose relay format this client does not
    /// interpret.
    pub fn body(&self) -> &'a [u8] {
        &self.frame[1..]
    }

    /// Total frame length.
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    /// Always `false`; a parsed frame has at least two bytes.
    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }
}

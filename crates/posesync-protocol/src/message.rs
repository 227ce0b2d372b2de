//! Typed inbound messages and the animation state packet.

use crate::frame::{encode_outbound, InboundFrame, PeerId};
use crate::{OpCode, ProtocolError};

/// Payload of an [`OpCode::Animation`] message.
///
/// ```text
/// [sequence:4, little-endian u32][compressed pose:N]
/// ```
///
/// The sequence is per sender and only ever grows; receivers use it to drop
/// late or duplicated packets, never to reassemble anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePacket {
    pub sequence: u32,
    /// Compressed pose bytes, opaque to the protocol.
    pub pose: Vec<u8>,
}

impl StatePacket {
    /// Length of the fixed sequence header.
    pub const HEADER_LEN: usize = 4;

    pub fn new(sequence: u32, pose: Vec<u8>) -> Self {
        Self { sequence, pose }
    }

    /// Serializes the payload (without opcode).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_LEN + self.pose.len());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&self.pose);
        out
    }

    /// Serializes a complete outbound `Animation` frame.
    pub fn to_frame(&self) -> Vec<u8> {
        encode_outbound(OpCode::Animation, &self.encode())
    }

    /// Parses the payload (opcode and sender already stripped).
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let Some((header, pose)) = payload.split_first_chunk::<4>() else {
            return Err(ProtocolError::PayloadTruncated {
                kind: "animation",
                len: payload.len(),
                min: Self::HEADER_LEN,
            });
        };
        Ok(Self {
            sequence: u32::from_le_bytes(*header),
            pose: pose.to_vec(),
        })
    }
}

/// Half the sequence space; differences beyond this are treated as wrap-around.
const SEQUENCE_WRAP_THRESHOLD: u32 = 1 << 31;

/// Whether sequence `s1` is newer than `s2`, tolerating wrap-around.
///
/// `sequence_greater_than(2, 1)` is true, `sequence_greater_than(1, 1)` is
/// false and `sequence_greater_than(0, u32::MAX)` is true.
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

/// One decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A participant joined the server.
    PeerConnected(PeerId),
    /// A participant left the server.
    PeerDisconnected(PeerId),
    /// Pose state relayed from a participant.
    Animation { sender: PeerId, packet: StatePacket },
    /// A known opcode the session core does not interpret.
    ///
    /// `body` is every byte after the opcode, exactly as received. The
    /// trailing-sender convention is only guaranteed for the core opcodes,
    /// so it is not stripped here.
    Reserved { opcode: OpCode, body: Vec<u8> },
}

impl Message {
    /// Validates and decodes one relayed frame.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let frame = InboundFrame::parse(raw)?;
        let opcode = frame.opcode()?;
        Ok(match opcode {
            OpCode::Connect => Message::PeerConnected(frame.sender()),
            OpCode::Disconnect => Message::PeerDisconnected(frame.sender()),
            OpCode::Animation => Message::Animation {
                sender: frame.sender(),
                packet: StatePacket::decode(frame.payload())?,
            },
            other => Message::Reserved {
                opcode: other,
                body: frame.body().to_vec(),
            },
        })
    }

    /// The opcode this message arrived with.
    pub fn opcode(&self) -> OpCode {
        match self {
            Message::PeerConnected(_) => OpCode::Connect,
            Message::PeerDisconnected(_) => OpCode::Disconnect,
            Message::Animation { .. } => OpCode::Animation,
            Message::Reserved { opcode, .. } => *opcode,
        }
    }
}

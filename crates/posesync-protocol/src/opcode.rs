//! The closed set of one-byte message tags.

use std::fmt;

use crate::ProtocolError;

/// Semantic kind of a message, always the first byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// A peer joined (inbound) / hello (outbound).
    Connect = 0,
    Settings = 1,
    Position = 2,
    /// Periodic pose state packet.
    Animation = 3,
    /// Appearance data, sent once after connecting.
    Texture = 4,
    Chat = 5,
    VersionNumber = 6,
    MapHash = 7,
    MapVote = 8,
    MapList = 9,
    StillAlive = 254,
    /// A peer left.
    Disconnect = 255,
}

impl OpCode {
    /// Every opcode, in wire-value order.
    pub const ALL: [OpCode; 12] = [
        OpCode::Connect,
        OpCode::Settings,
        OpCode::Position,
        OpCode::Animation,
        OpCode::Texture,
        OpCode::Chat,
        OpCode::VersionNumber,
        OpCode::MapHash,
        OpCode::MapVote,
        OpCode::MapList,
        OpCode::StillAlive,
        OpCode::Disconnect,
    ];

    /// The wire byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the session core itself acts on this opcode when received.
    ///
    /// Everything else is handed to the application untouched.
    pub fn is_core(self) -> bool {
        matches!(self, OpCode::Connect | OpCode::Disconnect | OpCode::Animation)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0 => OpCode::Connect,
            1 => OpCode::Settings,
            2 => OpCode::Position,
            3 => OpCode::Animation,
            4 => OpCode::Texture,
            5 => OpCode::Chat,
            6 => OpCode::VersionNumber,
            7 => OpCode::MapHash,
            8 => OpCode::MapVote,
            9 => OpCode::MapList,
            254 => OpCode::StillAlive,
            255 => OpCode::Disconnect,
            other => return Err(ProtocolError::UnknownOpcode(other)),
        })
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op.as_u8()
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({})", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(OpCode::Connect.as_u8(), 0);
        assert_eq!(OpCode::Animation.as_u8(), 3);
        assert_eq!(OpCode::MapList.as_u8(), 9);
        assert_eq!(OpCode::StillAlive.as_u8(), 254);
        assert_eq!(OpCode::Disconnect.as_u8(), 255);
    }

    #[test]
    fn test_try_from_accepts_every_listed_opcode() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::try_from(op.as_u8()), Ok(op));
        }
    }

    #[test]
    fn test_try_from_rejects_gaps() {
        for byte in [10u8, 42, 200, 253] {
            assert_eq!(
                OpCode::try_from(byte),
                Err(ProtocolError::UnknownOpcode(byte))
            );
        }
    }

    #[test]
    fn test_core_opcodes() {
        let core: Vec<_> = OpCode::ALL.into_iter().filter(|o| o.is_core()).collect();
        assert_eq!(
            core,
            vec![OpCode::Connect, OpCode::Animation, OpCode::Disconnect]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(OpCode::Chat.to_string(), "Chat(5)");
    }
}

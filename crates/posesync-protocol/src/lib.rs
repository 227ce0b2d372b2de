//! Wire protocol for posesync.
//!
//! - **Opcodes** ([`OpCode`]): the closed set of one-byte message tags.
//! - **Framing** ([`encode_outbound`], [`InboundFrame`]): the asymmetric
//!   envelope: outbound frames carry no sender id, inbound frames end with
//!   the id the server appended.
//! - **Messages** ([`Message`], [`StatePacket`]): typed decoders for each
//!   kind the session acts on.
//! - **Compression** ([`compress`], [`decompress`]): raw DEFLATE for pose
//!   payloads.
//!
//! ```text
//! Transport (bytes) → Protocol (Message) → Session (roster, pose sinks)
//! ```

mod compression;
mod error;
mod frame;
mod message;
mod opcode;

pub use compression::{
    compress, decompress, decompress_with_limit, MAX_DECOMPRESSED_LEN,
};
pub use error::{CodecError, ProtocolError};
pub use frame::{encode_outbound, InboundFrame, PeerId, MIN_INBOUND_LEN};
pub use message::{sequence_greater_than, Message, StatePacket};
pub use opcode::OpCode;

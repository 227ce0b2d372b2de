//! Property tests for compression and framing.
//!
//! Decoders face whatever the network hands them, so besides the round-trip
//! and length properties we check that arbitrary bytes never panic.

use posesync_protocol::{
    compress, decompress, encode_outbound, InboundFrame, Message, OpCode,
    StatePacket,
};
use proptest::prelude::*;

fn any_opcode() -> impl Strategy<Value = OpCode> {
    prop::sample::select(OpCode::ALL.to_vec())
}

proptest! {
    /// Property: decompress(compress(x)) == x, empty input included.
    #[test]
    fn compression_roundtrips(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        let packed = compress(&data).unwrap();
        prop_assert_eq!(decompress(&packed).unwrap(), data);
    }

    /// Property: arbitrary bytes never crash the inflater.
    #[test]
    fn arbitrary_bytes_dont_crash_decompress(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decompress(&data);
    }

    /// Property: inbound payload is exactly frame length minus two.
    #[test]
    fn inbound_payload_length(frame in prop::collection::vec(any::<u8>(), 2..512)) {
        let parsed = InboundFrame::parse(&frame).unwrap();
        prop_assert_eq!(parsed.payload().len(), frame.len() - 2);
        prop_assert_eq!(parsed.opcode_byte(), frame[0]);
        prop_assert_eq!(parsed.sender().0, frame[frame.len() - 1]);
    }

    /// Property: outbound frames are opcode + payload, never a trailing id.
    #[test]
    fn outbound_has_no_sender(op in any_opcode(), payload in prop::collection::vec(any::<u8>(), 0..256)) {
        let frame = encode_outbound(op, &payload);
        prop_assert_eq!(frame.len(), payload.len() + 1);
        prop_assert_eq!(frame[0], op.as_u8());
        prop_assert_eq!(&frame[1..], &payload[..]);
    }

    /// Property: a relayed animation frame decodes to the packet that was sent.
    #[test]
    fn relayed_animation_decodes(seq in any::<u32>(), pose in prop::collection::vec(any::<u8>(), 0..256), sender in any::<u8>()) {
        let mut frame = StatePacket::new(seq, pose.clone()).to_frame();
        frame.push(sender);
        match Message::decode(&frame).unwrap() {
            Message::Animation { sender: got, packet } => {
                prop_assert_eq!(got.0, sender);
                prop_assert_eq!(packet.sequence, seq);
                prop_assert_eq!(packet.pose, pose);
            }
            other => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    /// Property: arbitrary bytes never crash the message decoder.
    #[test]
    fn arbitrary_bytes_dont_crash_message_decode(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = Message::decode(&data);
    }
}

//! Inbound dispatch: one relayed frame in, one roster/sink effect out.
//!
//! Nothing in here returns an error. Every way a frame can be wrong ends in
//! [`Dispatched::Dropped`] with a reason and a `debug!` line, and the roster
//! is left exactly as it was.

use posesync_protocol::{
    decompress, CodecError, Message, OpCode, PeerId, ProtocolError,
};
use tracing::{debug, trace};

use crate::{PeerFactory, PoseSink, Roster};

/// A known message kind handed back to the application unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forwarded {
    pub opcode: OpCode,
    /// Every byte after the opcode, as received.
    pub body: Vec<u8>,
}

/// Why a frame was discarded.
#[derive(Debug)]
pub enum DropReason {
    /// The frame failed validation (too short, unknown opcode, short payload).
    Malformed(ProtocolError),
    /// Animation from a peer we have no Connect for yet.
    UnknownPeer(PeerId),
    /// Animation older than (or equal to) the last one applied.
    Stale {
        peer: PeerId,
        sequence: u32,
        last: u32,
    },
    /// The pose payload did not inflate.
    Codec { peer: PeerId, error: CodecError },
}

/// What dispatching one frame did.
#[derive(Debug)]
pub enum Dispatched {
    PeerAdded(PeerId),
    /// Connect for a peer already in the roster.
    PeerAlreadyKnown(PeerId),
    PeerRemoved(PeerId),
    /// Disconnect for a peer not in the roster.
    PeerAlreadyGone(PeerId),
    PoseApplied { peer: PeerId, sequence: u32 },
    Forwarded(Forwarded),
    Dropped(DropReason),
}

impl Dispatched {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Dispatched::Dropped(_))
    }
}

/// Decodes `raw` and applies it to `roster`.
pub fn dispatch<F: PeerFactory>(
    raw: &[u8],
    roster: &mut Roster<F::Sink>,
    factory: &mut F,
) -> Dispatched {
    let message = match Message::decode(raw) {
        Ok(message) => message,
        Err(e) => {
            debug!(len = raw.len(), error = %e, "dropping malformed frame");
            return Dispatched::Dropped(DropReason::Malformed(e));
        }
    };

    match message {
        Message::PeerConnected(peer) => {
            if roster.insert_with(peer, || factory.create(peer)) {
                debug!(%peer, "peer joined");
                Dispatched::PeerAdded(peer)
            } else {
                trace!(%peer, "duplicate connect");
                Dispatched::PeerAlreadyKnown(peer)
            }
        }
        Message::PeerDisconnected(peer) => {
            if roster.remove(peer) {
                debug!(%peer, "peer left");
                Dispatched::PeerRemoved(peer)
            } else {
                trace!(%peer, "disconnect for unknown peer");
                Dispatched::PeerAlreadyGone(peer)
            }
        }
        Message::Animation { sender, packet } => {
            let Some(remote) = roster.get_mut(sender) else {
                debug!(peer = %sender, "animation before connect — dropping");
                return Dispatched::Dropped(DropReason::UnknownPeer(sender));
            };

            if !remote.is_fresh(packet.sequence) {
                let last = remote.last_sequence().unwrap_or_default();
                trace!(peer = %sender, seq = packet.sequence, last, "stale animation");
                return Dispatched::Dropped(DropReason::Stale {
                    peer: sender,
                    sequence: packet.sequence,
                    last,
                });
            }

            match decompress(&packet.pose) {
                Ok(pose) => {
                    remote.mark_applied(packet.sequence);
                    remote.sink_mut().apply_animation(pose);
                    trace!(peer = %sender, seq = packet.sequence, "pose applied");
                    Dispatched::PoseApplied {
                        peer: sender,
                        sequence: packet.sequence,
                    }
                }
                Err(error) => {
                    debug!(peer = %sender, seq = packet.sequence, %error, "dropping undecodable pose");
                    Dispatched::Dropped(DropReason::Codec {
                        peer: sender,
                        error,
                    })
                }
            }
        }
        Message::Reserved { opcode, body } => {
            trace!(%opcode, len = body.len(), "forwarding");
            Dispatched::Forwarded(Forwarded { opcode, body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posesync_protocol::{compress, StatePacket};
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(PeerId, Vec<u8>)>>>;

    struct RecordingSink {
        peer: PeerId,
        log: Log,
    }

    impl PoseSink for RecordingSink {
        fn apply_animation(&mut self, pose: Vec<u8>) {
            self.log.lock().unwrap().push((self.peer, pose));
        }
    }

    fn setup() -> (Roster<RecordingSink>, impl PeerFactory<Sink = RecordingSink>, Log) {
        let log: Log = Arc::default();
        let factory_log = Arc::clone(&log);
        let factory = move |peer: PeerId| RecordingSink {
            peer,
            log: Arc::clone(&factory_log),
        };
        (Roster::new(), factory, log)
    }

    fn animation_frame(sender: u8, sequence: u32, pose: &[u8]) -> Vec<u8> {
        let mut frame = StatePacket::new(sequence, compress(pose).unwrap()).to_frame();
        frame.push(sender);
        frame
    }

    #[test]
    fn test_connect_then_animation_reaches_sink_once() {
        let (mut roster, mut factory, log) = setup();

        assert!(matches!(
            dispatch(&[0, 7], &mut roster, &mut factory),
            Dispatched::PeerAdded(PeerId(7))
        ));
        let result = dispatch(&animation_frame(7, 0, b"pose"), &mut roster, &mut factory);
        assert!(matches!(
            result,
            Dispatched::PoseApplied { peer: PeerId(7), sequence: 0 }
        ));

        assert_eq!(*log.lock().unwrap(), vec![(PeerId(7), b"pose".to_vec())]);
    }

    #[test]
    fn test_duplicate_connect_keeps_one_entry() {
        let (mut roster, mut factory, _) = setup();
        dispatch(&[0, 2], &mut roster, &mut factory);
        assert!(matches!(
            dispatch(&[0, 2], &mut roster, &mut factory),
            Dispatched::PeerAlreadyKnown(PeerId(2))
        ));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_disconnect_removes_and_later_animation_drops() {
        let (mut roster, mut factory, log) = setup();
        dispatch(&[0, 7], &mut roster, &mut factory);
        assert!(matches!(
            dispatch(&[255, 7], &mut roster, &mut factory),
            Dispatched::PeerRemoved(PeerId(7))
        ));
        assert!(!roster.contains(PeerId(7)));

        let result = dispatch(&animation_frame(7, 1, b"late"), &mut roster, &mut factory);
        assert!(matches!(
            result,
            Dispatched::Dropped(DropReason::UnknownPeer(PeerId(7)))
        ));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_disconnect_unknown_is_noop() {
        let (mut roster, mut factory, _) = setup();
        dispatch(&[0, 1], &mut roster, &mut factory);
        assert!(matches!(
            dispatch(&[255, 9], &mut roster, &mut factory),
            Dispatched::PeerAlreadyGone(PeerId(9))
        ));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_stale_and_duplicate_sequences_drop() {
        let (mut roster, mut factory, log) = setup();
        dispatch(&[0, 3], &mut roster, &mut factory);
        dispatch(&animation_frame(3, 5, b"a"), &mut roster, &mut factory);

        for seq in [5, 4] {
            let result = dispatch(&animation_frame(3, seq, b"old"), &mut roster, &mut factory);
            assert!(matches!(
                result,
                Dispatched::Dropped(DropReason::Stale { last: 5, .. })
            ));
        }
        dispatch(&animation_frame(3, 6, b"b"), &mut roster, &mut factory);

        let poses: Vec<_> = log.lock().unwrap().iter().map(|(_, p)| p.clone()).collect();
        assert_eq!(poses, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_corrupt_pose_drops_without_advancing_sequence() {
        let (mut roster, mut factory, _) = setup();
        dispatch(&[0, 4], &mut roster, &mut factory);

        let mut frame = StatePacket::new(1, vec![0xFF, 0xFF, 0xFF]).to_frame();
        frame.push(4);
        assert!(matches!(
            dispatch(&frame, &mut roster, &mut factory),
            Dispatched::Dropped(DropReason::Codec { peer: PeerId(4), .. })
        ));
        assert_eq!(roster.get(PeerId(4)).unwrap().last_sequence(), None);
    }

    #[test]
    fn test_malformed_and_unknown_frames_drop() {
        let (mut roster, mut factory, _) = setup();
        for raw in [&[][..], &[3][..], &[42, 1][..], &[3, 0, 1][..]] {
            assert!(dispatch(raw, &mut roster, &mut factory).is_dropped());
        }
        assert!(roster.is_empty());
    }

    #[test]
    fn test_reserved_opcodes_forward_body() {
        let (mut roster, mut factory, _) = setup();
        match dispatch(&[5, b'h', b'i', 2], &mut roster, &mut factory) {
            Dispatched::Forwarded(fwd) => {
                assert_eq!(fwd.opcode, OpCode::Chat);
                assert_eq!(fwd.body, vec![b'h', b'i', 2]);
            }
            other => panic!("expected forward, got {other:?}"),
        }
    }
}

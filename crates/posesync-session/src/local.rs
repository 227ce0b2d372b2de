//! Collaborator seams: the local player on one side, remote playback on the
//! other.
//!
//! The session never looks inside pose bytes. It asks the [`LocalState`]
//! for a timestamp and a serialized pose, and hands inflated bytes from
//! remote peers to whatever [`PoseSink`] the [`PeerFactory`] produced.

use posesync_protocol::PeerId;
use posesync_transport::Delivery;

/// A serialized local pose, ready for compression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoseSnapshot {
    pub bytes: Vec<u8>,
    /// How this snapshot should travel. Pose data normally goes unreliable.
    pub delivery: Delivery,
}

impl PoseSnapshot {
    /// A snapshot sent with the default (unreliable) delivery.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            delivery: Delivery::default(),
        }
    }

    /// A snapshot sent reliably.
    pub fn reliable(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            delivery: Delivery::Reliable,
        }
    }
}

/// The local player, as seen by the synchronization task.
///
/// Called from the background task, hence `Send + Sync`. Implementations
/// typically keep the latest pose behind a mutex that the game thread
/// updates every frame.
pub trait LocalState: Send + Sync + 'static {
    /// Timestamp of the most recent pose sample.
    ///
    /// The sync task only sends when this differs from the last timestamp
    /// it sent; equal timestamps mean "nothing new".
    fn current_timestamp(&self) -> f32;

    /// Serializes the current pose.
    fn serialize_pose(&self) -> PoseSnapshot;

    /// Appearance data sent once, reliably, right after connecting.
    fn presentation_payload(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Per-peer playback target for inflated animation bytes.
pub trait PoseSink: Send + 'static {
    /// Receives one decompressed animation payload.
    fn apply_animation(&mut self, pose: Vec<u8>);

    /// Called once when the peer leaves the roster.
    fn on_removed(&mut self) {}
}

/// Creates a [`PoseSink`] for every peer that joins.
pub trait PeerFactory: Send + 'static {
    type Sink: PoseSink;

    fn create(&mut self, peer: PeerId) -> Self::Sink;
}

impl<F, S> PeerFactory for F
where
    F: FnMut(PeerId) -> S + Send + 'static,
    S: PoseSink,
{
    type Sink = S;

    fn create(&mut self, peer: PeerId) -> S {
        self(peer)
    }
}

//! The remote roster: every other participant currently on the server.
//!
//! Owned by the foreground client and mutated only while dispatching inbound
//! frames. Membership changes are idempotent so a duplicated Connect or a
//! Disconnect for someone we never saw is harmless.

use std::collections::HashMap;

use posesync_protocol::{sequence_greater_than, PeerId};

use crate::PoseSink;

/// One remote participant.
#[derive(Debug)]
pub struct RemotePeer<S> {
    id: PeerId,
    /// Sequence of the last animation packet applied, if any.
    last_sequence: Option<u32>,
    sink: S,
}

impl<S> RemotePeer<S> {
    fn new(id: PeerId, sink: S) -> Self {
        Self {
            id,
            last_sequence: None,
            sink,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn last_sequence(&self) -> Option<u32> {
        self.last_sequence
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Whether `sequence` is newer than anything applied so far.
    pub fn is_fresh(&self, sequence: u32) -> bool {
        match self.last_sequence {
            None => true,
            Some(last) => sequence_greater_than(sequence, last),
        }
    }

    /// Records `sequence` as applied.
    pub(crate) fn mark_applied(&mut self, sequence: u32) {
        self.last_sequence = Some(sequence);
    }
}

/// Remote participants keyed by their server-assigned id.
#[derive(Debug)]
pub struct Roster<S> {
    peers: HashMap<PeerId, RemotePeer<S>>,
}

impl<S> Default for Roster<S> {
    fn default() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }
}

impl<S: PoseSink> Roster<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id` unless it is already present.
    ///
    /// `make_sink` only runs when the peer is new. Returns `true` if the
    /// roster grew.
    pub fn insert_with(
        &mut self,
        id: PeerId,
        make_sink: impl FnOnce() -> S,
    ) -> bool {
        if self.peers.contains_key(&id) {
            return false;
        }
        self.peers.insert(id, RemotePeer::new(id, make_sink()));
        true
    }

    /// Removes `id`, notifying its sink. Returns `false` if it was absent.
    pub fn remove(&mut self, id: PeerId) -> bool {
        match self.peers.remove(&id) {
            Some(mut peer) => {
                peer.sink.on_removed();
                true
            }
            None => false,
        }
    }

    /// Removes every peer, notifying each sink. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.peers.len();
        for (_, mut peer) in self.peers.drain() {
            peer.sink.on_removed();
        }
        count
    }

    pub fn get(&self, id: PeerId) -> Option<&RemotePeer<S>> {
        self.peers.get(&id)
    }

    pub fn get_mut(&mut self, id: PeerId) -> Option<&mut RemotePeer<S>> {
        self.peers.get_mut(&id)
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Ids of all present peers, in ascending order.
    pub fn ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<_> = self.peers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemotePeer<S>> {
        self.peers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct CountingSink {
        applied: usize,
        removed: bool,
    }

    impl PoseSink for CountingSink {
        fn apply_animation(&mut self, _pose: Vec<u8>) {
            self.applied += 1;
        }

        fn on_removed(&mut self) {
            self.removed = true;
        }
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut roster = Roster::<CountingSink>::new();
        assert!(roster.insert_with(PeerId(3), CountingSink::default));
        assert!(!roster.insert_with(PeerId(3), || {
            panic!("sink must not be built for a known peer")
        }));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut roster = Roster::<CountingSink>::new();
        roster.insert_with(PeerId(1), CountingSink::default);
        assert!(!roster.remove(PeerId(2)));
        assert_eq!(roster.len(), 1);
        assert!(roster.remove(PeerId(1)));
        assert!(roster.is_empty());
    }

    #[test]
    fn test_clear_reports_count() {
        let mut roster = Roster::<CountingSink>::new();
        for id in [4, 1, 9] {
            roster.insert_with(PeerId(id), CountingSink::default);
        }
        assert_eq!(roster.ids(), vec![PeerId(1), PeerId(4), PeerId(9)]);
        assert_eq!(roster.clear(), 3);
        assert!(roster.is_empty());
    }

    #[test]
    fn test_freshness_tracks_last_applied() {
        let mut roster = Roster::<CountingSink>::new();
        roster.insert_with(PeerId(5), CountingSink::default);
        let peer = roster.get_mut(PeerId(5)).unwrap();

        assert!(peer.is_fresh(0));
        peer.mark_applied(10);
        assert!(!peer.is_fresh(10), "duplicate");
        assert!(!peer.is_fresh(9), "late");
        assert!(peer.is_fresh(11));
        assert_eq!(peer.last_sequence(), Some(10));
    }

    #[test]
    fn test_id_reuse_starts_fresh() {
        let mut roster = Roster::<CountingSink>::new();
        roster.insert_with(PeerId(2), CountingSink::default);
        roster.get_mut(PeerId(2)).unwrap().mark_applied(500);
        roster.remove(PeerId(2));

        roster.insert_with(PeerId(2), CountingSink::default);
        let peer = roster.get(PeerId(2)).unwrap();
        assert_eq!(peer.last_sequence(), None);
        assert!(peer.is_fresh(0));
        assert_eq!(peer.sink().applied, 0);
    }
}

//! In-memory doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use posesync_transport::{Connection, ConnectionId, Delivery, TransportError};

use crate::{LocalState, PoseSnapshot};

/// Records every successful send.
#[derive(Default)]
pub(crate) struct RecordingConnection {
    frames: Mutex<Vec<(Vec<u8>, Delivery)>>,
    fail: AtomicBool,
    hang: AtomicBool,
    closed: AtomicBool,
}

impl RecordingConnection {
    pub(crate) fn frames(&self) -> Vec<(Vec<u8>, Delivery)> {
        self.frames.lock().unwrap().clone()
    }

    pub(crate) fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Makes every send pend forever.
    pub(crate) fn hang_sends(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Connection for RecordingConnection {
    async fn send(&self, data: &[u8], delivery: Delivery) -> Result<(), TransportError> {
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed("closed".into()));
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.frames.lock().unwrap().push((data.to_vec(), delivery));
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        ConnectionId::new(0)
    }
}

/// A local player whose timestamp only moves when told to.
pub(crate) struct FakeLocal {
    /// Timestamp in whole "frames", exposed as `f32`.
    frame: AtomicU32,
    pose: Mutex<Vec<u8>>,
    auto_advance: AtomicBool,
    reliable: bool,
}

impl FakeLocal {
    pub(crate) fn new(pose: &[u8]) -> Self {
        Self {
            frame: AtomicU32::new(1),
            pose: Mutex::new(pose.to_vec()),
            auto_advance: AtomicBool::new(false),
            reliable: false,
        }
    }

    pub(crate) fn reliable(mut self) -> Self {
        self.reliable = true;
        self
    }

    /// Moves the timestamp forward and swaps the pose.
    pub(crate) fn advance(&self, pose: &[u8]) {
        self.frame.fetch_add(1, Ordering::SeqCst);
        *self.pose.lock().unwrap() = pose.to_vec();
    }

    /// Every timestamp read returns a new value.
    pub(crate) fn set_auto_advance(&self, on: bool) {
        self.auto_advance.store(on, Ordering::SeqCst);
    }
}

impl LocalState for FakeLocal {
    fn current_timestamp(&self) -> f32 {
        let frame = if self.auto_advance.load(Ordering::SeqCst) {
            self.frame.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.frame.load(Ordering::SeqCst)
        };
        frame as f32
    }

    fn serialize_pose(&self) -> PoseSnapshot {
        let bytes = self.pose.lock().unwrap().clone();
        if self.reliable {
            PoseSnapshot::reliable(bytes)
        } else {
            PoseSnapshot::new(bytes)
        }
    }
}

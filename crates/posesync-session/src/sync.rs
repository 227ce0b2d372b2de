//! The background pose broadcast.
//!
//! [`SyncHandle::spawn`] starts a Tokio task that owns exactly what it needs
//! to send: the connection's send half, the local-state adapter, a ticker, a
//! sequence counter and a stop receiver. It has no path to the roster or the
//! session status, so it cannot mutate them.
//!
//! Per tick:
//!
//! 1. read the local pose timestamp
//! 2. equal to the last one sent → skip (delta suppression)
//! 3. serialize, compress, wrap as `Animation` with the next sequence, send
//!
//! A failed send is logged and counted; the next tick tries again. Loss of
//! the connection itself is reported by the transport's status events, not
//! by this task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use posesync_protocol::{compress, StatePacket};
use posesync_tick::{TickConfig, Ticker};
use posesync_transport::Connection;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::LocalState;

/// Counters written by the sync task, readable from anywhere.
#[derive(Debug, Default)]
struct SyncCounters {
    sent: AtomicU64,
    suppressed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of the sync task's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Animation packets handed to the transport successfully.
    pub sent: u64,
    /// Ticks skipped because the pose timestamp had not changed.
    pub suppressed: u64,
    /// Ticks whose compression or send failed.
    pub failed: u64,
}

impl SyncCounters {
    fn snapshot(&self) -> SyncStats {
        SyncStats {
            sent: self.sent.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Sent { sequence: u32 },
    Suppressed,
    Failed,
}

/// State owned by the background task.
pub(crate) struct SyncTask<C, L> {
    connection: Arc<C>,
    local: Arc<L>,
    counters: Arc<SyncCounters>,
    last_sent: Option<f32>,
    next_sequence: u32,
}

impl<C: Connection, L: LocalState> SyncTask<C, L> {
    fn new(connection: Arc<C>, local: Arc<L>, counters: Arc<SyncCounters>) -> Self {
        Self {
            connection,
            local,
            counters,
            last_sent: None,
            next_sequence: 0,
        }
    }

    /// Runs until `stop` flips to `true` or its sender is dropped.
    async fn run(mut self, mut ticker: Ticker, mut stop: watch::Receiver<bool>) {
        debug!(period_ms = ticker.period().as_secs_f64() * 1000.0, "sync loop started");
        loop {
            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                info = ticker.wait_for_tick() => {
                    let outcome = self.tick().await;
                    trace!(tick = info.tick, ?outcome, "sync tick");
                }
            }
        }
        debug!(next_sequence = self.next_sequence, "sync loop stopped");
    }

    /// One broadcast attempt.
    pub(crate) async fn tick(&mut self) -> TickOutcome {
        let timestamp = self.local.current_timestamp();
        if self.last_sent == Some(timestamp) {
            self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
            return TickOutcome::Suppressed;
        }
        self.last_sent = Some(timestamp);

        let snapshot = self.local.serialize_pose();
        let pose = match compress(&snapshot.bytes) {
            Ok(pose) => pose,
            Err(e) => {
                warn!(error = %e, "failed to compress pose — skipping tick");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                return TickOutcome::Failed;
            }
        };

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let frame = StatePacket::new(sequence, pose).to_frame();

        match self.connection.send(&frame, snapshot.delivery).await {
            Ok(()) => {
                self.counters.sent.fetch_add(1, Ordering::Relaxed);
                TickOutcome::Sent { sequence }
            }
            Err(e) => {
                warn!(seq = sequence, error = %e, "failed to send pose");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                TickOutcome::Failed
            }
        }
    }
}

/// Owned handle to a running sync task.
///
/// Dropping the handle signals the task and aborts it; [`stop`](Self::stop)
/// is the orderly way and waits for the task to finish.
pub struct SyncHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    counters: Arc<SyncCounters>,
}

impl SyncHandle {
    /// Spawns the broadcast task on the current runtime.
    pub fn spawn<C: Connection, L: LocalState>(
        connection: Arc<C>,
        local: Arc<L>,
        tick: TickConfig,
    ) -> Self {
        let counters = Arc::new(SyncCounters::default());
        let (stop, stop_rx) = watch::channel(false);
        let task = SyncTask::new(connection, local, Arc::clone(&counters));
        let handle = tokio::spawn(task.run(Ticker::new(tick), stop_rx));
        Self {
            stop,
            task: Some(handle),
            counters,
        }
    }

    /// Current counters.
    pub fn stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    /// Signals the task and waits up to `timeout` for it to exit.
    ///
    /// If the task does not finish in time it is aborted, and this still
    /// waits for the abort to land, so no send can happen after `stop`
    /// returns. Returns `true` if the task exited on its own.
    pub async fn stop(mut self, timeout: Duration) -> bool {
        let _ = self.stop.send(true);
        let Some(mut task) = self.task.take() else {
            return true;
        };

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(_) => true,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "sync loop did not stop in time — aborting");
                task.abort();
                let _ = task.await;
                false
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLocal, RecordingConnection};
    use posesync_protocol::{decompress, Message, PeerId};
    use posesync_transport::Delivery;

    fn task(
        local: &Arc<FakeLocal>,
    ) -> (SyncTask<RecordingConnection, FakeLocal>, Arc<RecordingConnection>) {
        let conn = Arc::new(RecordingConnection::default());
        let task = SyncTask::new(
            Arc::clone(&conn),
            Arc::clone(local),
            Arc::new(SyncCounters::default()),
        );
        (task, conn)
    }

    #[tokio::test]
    async fn test_unchanged_timestamp_is_suppressed() {
        let local = Arc::new(FakeLocal::new(b"pose"));
        let (mut task, conn) = task(&local);

        assert_eq!(task.tick().await, TickOutcome::Sent { sequence: 0 });
        assert_eq!(task.tick().await, TickOutcome::Suppressed);
        assert_eq!(task.tick().await, TickOutcome::Suppressed);

        local.advance(b"pose");
        assert_eq!(task.tick().await, TickOutcome::Sent { sequence: 1 });

        assert_eq!(conn.frames().len(), 2);
        assert_eq!(
            task.counters.snapshot(),
            SyncStats { sent: 2, suppressed: 2, failed: 0 }
        );
    }

    #[tokio::test]
    async fn test_frames_are_sequenced_compressed_animation() {
        let local = Arc::new(FakeLocal::new(b"first"));
        let (mut task, conn) = task(&local);

        task.tick().await;
        local.advance(b"second");
        task.tick().await;

        let frames = conn.frames();
        let mut last = None;
        for ((frame, delivery), expected) in frames.iter().zip([b"first".as_slice(), b"second"]) {
            assert_eq!(*delivery, Delivery::Unreliable);
            // Pretend the server relayed it from peer 1.
            let mut relayed = frame.clone();
            relayed.push(1);
            let Message::Animation { sender, packet } = Message::decode(&relayed).unwrap() else {
                panic!("not an animation frame");
            };
            assert_eq!(sender, PeerId(1));
            assert_eq!(decompress(&packet.pose).unwrap(), expected);
            if let Some(prev) = last {
                assert!(packet.sequence > prev);
            }
            last = Some(packet.sequence);
        }
    }

    #[tokio::test]
    async fn test_failed_send_is_counted_and_loop_continues() {
        let local = Arc::new(FakeLocal::new(b"p"));
        let (mut task, conn) = task(&local);
        conn.fail_sends(true);

        assert_eq!(task.tick().await, TickOutcome::Failed);

        conn.fail_sends(false);
        local.advance(b"p");
        // The failed packet still consumed sequence 0.
        assert_eq!(task.tick().await, TickOutcome::Sent { sequence: 1 });
        assert_eq!(task.counters.snapshot().failed, 1);
    }

    #[tokio::test]
    async fn test_reliable_snapshot_goes_reliable() {
        let local = Arc::new(FakeLocal::new(b"p").reliable());
        let (mut task, conn) = task(&local);
        task.tick().await;
        assert_eq!(conn.frames()[0].1, Delivery::Reliable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_sleep_exits_within_one_tick() {
        let local = Arc::new(FakeLocal::new(b"p"));
        local.set_auto_advance(true);
        let conn = Arc::new(RecordingConnection::default());

        let handle = SyncHandle::spawn(
            Arc::clone(&conn),
            Arc::clone(&local),
            TickConfig::with_rate(10),
        );

        // Three ticks at 100 ms, then stop 50 ms into the fourth sleep.
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(handle.stats().sent, 3);

        let start = tokio::time::Instant::now();
        assert!(handle.stop(Duration::from_secs(1)).await);
        assert!(start.elapsed() < Duration::from_millis(100));

        let sent = conn.frames().len();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(conn.frames().len(), sent, "no sends after stop");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_aborts_a_stuck_send() {
        let local = Arc::new(FakeLocal::new(b"p"));
        let conn = Arc::new(RecordingConnection::default());
        conn.hang_sends(true);

        let handle = SyncHandle::spawn(
            Arc::clone(&conn),
            Arc::clone(&local),
            TickConfig::with_rate(10),
        );
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!handle.stop(Duration::from_millis(200)).await);
        assert!(conn.frames().is_empty());
    }
}

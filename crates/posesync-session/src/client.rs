//! The client: one server session, driven from the foreground.
//!
//! The application calls [`Client::update`] once per frame. That drains the
//! transport's event channel, runs status changes through
//! [`SessionStatus::on_transport`], and dispatches inbound frames to the
//! roster. Everything the roster and status touch happens inside `update`,
//! `connect` and `disconnect`, so they never need a lock.
//!
//! # Lifecycle
//!
//! ```text
//! connect() ──→ [Connecting] ──update()──→ [Connected] ──disconnect()──→ [Idle]
//!                    │                          │
//!                    │ refused / timeout        │ server closed
//!                    ▼                          ▼
//!                [Failed] ──disconnect()──→ [Idle] ←── teardown
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use posesync_protocol::{encode_outbound, OpCode, PeerId};
use posesync_transport::{
    Connection, ConnectionStatus, Connector, Delivery, TransportEvent,
};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::sync::{SyncHandle, SyncStats};
use crate::{
    dispatch, Action, ClientConfig, Dispatched, Forwarded, LocalState,
    PeerFactory, RemotePeer, Roster, SessionError, SessionStatus,
};

static NEXT_LOCAL_ID: AtomicU64 = AtomicU64::new(1);

/// Resources held between `connect()` and teardown.
struct ActiveSession<C> {
    username: String,
    connection: Arc<C>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    sync: Option<SyncHandle>,
    started: Instant,
}

/// What one [`Client::update`] call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Status after the update.
    pub status: SessionStatus,
    /// Inbound frames taken off the channel.
    pub processed: usize,
    /// Frames among them that were dropped.
    pub dropped: usize,
    /// Reserved-opcode messages for the application to handle.
    pub forwarded: Vec<Forwarded>,
}

/// A multiplayer client session.
///
/// - `C` opens the transport (normally
///   [`WebSocketConnector`](posesync_transport::WebSocketConnector))
/// - `L` supplies the local pose
/// - `F` builds a pose sink for every remote peer
pub struct Client<C: Connector, L: LocalState, F: PeerFactory> {
    config: ClientConfig,
    connector: C,
    local: Arc<L>,
    factory: F,
    roster: Roster<F::Sink>,
    status: SessionStatus,
    status_tx: watch::Sender<SessionStatus>,
    session: Option<ActiveSession<C::Connection>>,
    local_id: u64,
}

impl<C: Connector, L: LocalState, F: PeerFactory> Client<C, L, F> {
    /// Creates an idle client with the default config.
    pub fn new(connector: C, local: Arc<L>, factory: F) -> Self {
        Self::with_config(ClientConfig::default(), connector, local, factory)
    }

    /// Creates an idle client. The config is clamped with
    /// [`ClientConfig::validated`].
    pub fn with_config(
        config: ClientConfig,
        connector: C,
        local: Arc<L>,
        factory: F,
    ) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Idle);
        Self {
            config: config.validated(),
            connector,
            local,
            factory,
            roster: Roster::new(),
            status: SessionStatus::Idle,
            status_tx,
            session: None,
            local_id: NEXT_LOCAL_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Starts connecting to `address:port` as `username`.
    ///
    /// Returns as soon as the request is issued; the outcome shows up in a
    /// later [`update`](Self::update).
    ///
    /// # Errors
    /// [`SessionError::InvalidState`] unless the client is `Idle`, or the
    /// transport's error if it could not even start the attempt (the client
    /// then stays `Idle`).
    pub fn connect(
        &mut self,
        address: &str,
        port: u16,
        username: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.status != SessionStatus::Idle {
            return Err(SessionError::InvalidState {
                operation: "connect",
                status: self.status,
            });
        }

        let username = username.into();
        let link = self.connector.connect(address, port)?;
        info!(
            %address,
            port,
            %username,
            conn = %link.connection.id(),
            "connecting"
        );

        self.session = Some(ActiveSession {
            username,
            connection: link.connection,
            events: link.events,
            sync: None,
            started: Instant::now(),
        });
        self.set_status(SessionStatus::Connecting);
        Ok(())
    }

    /// Processes pending transport events without waiting for new ones.
    ///
    /// At most `max_messages` inbound frames are dispatched per call; the
    /// rest stay queued for the next one.
    pub async fn update(&mut self) -> UpdateReport {
        let mut report = UpdateReport {
            status: self.status,
            processed: 0,
            dropped: 0,
            forwarded: Vec::new(),
        };

        while report.processed < self.config.max_messages {
            let Some(session) = self.session.as_mut() else {
                break;
            };
            let event = match session.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("transport event channel closed");
                    TransportEvent::Status(ConnectionStatus::ProblemDetectedLocally)
                }
            };

            match event {
                TransportEvent::Status(status) => self.apply_status(status).await,
                TransportEvent::Message(raw) => {
                    report.processed += 1;
                    match dispatch(&raw, &mut self.roster, &mut self.factory) {
                        Dispatched::Forwarded(forwarded) => {
                            report.forwarded.push(forwarded)
                        }
                        Dispatched::Dropped(_) => report.dropped += 1,
                        _ => {}
                    }
                }
            }
        }

        self.check_connect_timeout().await;
        report.status = self.status;
        report
    }

    /// Ends the session and returns to `Idle`.
    ///
    /// Stops the sync task (waiting at most `join_timeout`), then closes the
    /// transport, then clears the roster. From `Failed` this just
    /// acknowledges the failure. A no-op when already `Idle`.
    pub async fn disconnect(&mut self) {
        match self.status {
            SessionStatus::Idle | SessionStatus::Disconnecting => {
                trace!(status = %self.status, "disconnect: nothing to do");
            }
            SessionStatus::Failed => self.set_status(SessionStatus::Idle),
            SessionStatus::Connecting | SessionStatus::Connected => {
                self.set_status(SessionStatus::Disconnecting);
                self.teardown().await;
                self.set_status(SessionStatus::Idle);
            }
        }
    }

    /// Sends a message for one of the reserved opcodes (chat, settings, …).
    ///
    /// # Errors
    /// - [`SessionError::ReservedOpcode`] for `Animation`, which only the
    ///   sync task sends
    /// - [`SessionError::InvalidState`] unless `Connected`
    /// - the transport's error if the send fails
    pub async fn send(
        &self,
        opcode: OpCode,
        payload: &[u8],
        delivery: Delivery,
    ) -> Result<(), SessionError> {
        if opcode == OpCode::Animation {
            return Err(SessionError::ReservedOpcode(opcode));
        }
        let session = match (&self.session, self.status) {
            (Some(session), SessionStatus::Connected) => session,
            _ => {
                return Err(SessionError::InvalidState {
                    operation: "send",
                    status: self.status,
                });
            }
        };

        let frame = encode_outbound(opcode, payload);
        session.connection.send(&frame, delivery).await?;
        trace!(%opcode, len = payload.len(), "sent");
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Receiver that sees every status change.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    pub fn roster(&self) -> &Roster<F::Sink> {
        &self.roster
    }

    pub fn peer(&self, id: PeerId) -> Option<&RemotePeer<F::Sink>> {
        self.roster.get(id)
    }

    /// Username of the current session, if any.
    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.username.as_str())
    }

    /// Process-local identifier for this client. Never sent to the server.
    pub fn local_id(&self) -> u64 {
        self.local_id
    }

    pub fn local(&self) -> &Arc<L> {
        &self.local
    }

    /// Counters of the running sync task.
    pub fn sync_stats(&self) -> Option<SyncStats> {
        self.session
            .as_ref()
            .and_then(|s| s.sync.as_ref())
            .map(SyncHandle::stats)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.status_tx.send_replace(status);
    }

    async fn apply_status(&mut self, event: ConnectionStatus) {
        let transition = self.status.on_transport(event);
        if transition.action == Action::None {
            trace!(status = %self.status, %event, "transport status ignored");
            return;
        }

        info!(
            from = %self.status,
            to = %transition.next,
            %event,
            "session status changed"
        );
        self.set_status(transition.next);

        match transition.action {
            Action::None => {}
            Action::StartSync => self.start_sync().await,
            Action::Teardown => {
                self.teardown().await;
                if transition.next == SessionStatus::Disconnecting {
                    self.set_status(SessionStatus::Idle);
                }
            }
        }
    }

    async fn start_sync(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        if let Some(payload) = self.local.presentation_payload() {
            let frame = encode_outbound(OpCode::Texture, &payload);
            match session.connection.send(&frame, Delivery::Reliable).await {
                Ok(()) => debug!(len = payload.len(), "presentation payload sent"),
                Err(e) => warn!(error = %e, "failed to send presentation payload"),
            }
        }

        session.sync = Some(SyncHandle::spawn(
            Arc::clone(&session.connection),
            Arc::clone(&self.local),
            self.config.tick_config(),
        ));
        debug!(rate_hz = self.config.tick_rate, "sync task started");
    }

    /// Releases everything the session holds, in order: sync task, transport,
    /// roster.
    async fn teardown(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let ActiveSession {
            username,
            connection,
            sync,
            ..
        } = session;

        if let Some(sync) = sync {
            let stats = sync.stats();
            let clean = sync.stop(self.config.join_timeout()).await;
            debug!(
                clean,
                sent = stats.sent,
                suppressed = stats.suppressed,
                failed = stats.failed,
                "sync task stopped"
            );
        }

        if let Err(e) = connection.close().await {
            debug!(error = %e, "error closing transport");
        }

        let peers = self.roster.clear();
        info!(%username, peers, "session released");
    }

    async fn check_connect_timeout(&mut self) {
        if self.status != SessionStatus::Connecting {
            return;
        }
        let (Some(limit), Some(session)) =
            (self.config.connect_timeout(), self.session.as_ref())
        else {
            return;
        };
        if session.started.elapsed() >= limit {
            warn!(
                timeout_ms = limit.as_millis() as u64,
                "connect timed out"
            );
            self.apply_status(ConnectionStatus::ProblemDetectedLocally)
                .await;
        }
    }
}

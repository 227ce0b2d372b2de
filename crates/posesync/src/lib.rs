//! # posesync
//!
//! Client-side multiplayer pose synchronization over a relay server.
//!
//! A [`Client`] keeps one connection to a server that relays every message
//! to the other participants. It streams the local player's pose at a fixed
//! tick rate, keeps a roster of remote peers, and feeds their poses to
//! whatever playback sink the application provides.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use posesync::prelude::*;
//!
//! struct Me;
//! impl LocalState for Me {
//!     fn current_timestamp(&self) -> f32 { 0.0 }
//!     fn serialize_pose(&self) -> PoseSnapshot { PoseSnapshot::new(vec![]) }
//! }
//!
//! struct Puppet;
//! impl PoseSink for Puppet {
//!     fn apply_animation(&mut self, _pose: Vec<u8>) {}
//! }
//!
//! # async fn run() -> Result<(), PosesyncError> {
//! let mut client = Client::new(
//!     WebSocketConnector::new(),
//!     Arc::new(Me),
//!     |_peer: PeerId| Puppet,
//! );
//! client.connect("127.0.0.1", 7777, "player")?;
//! loop {
//!     let report = client.update().await;
//!     if report.status == SessionStatus::Idle {
//!         break;
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub mod logging;

pub use error::PosesyncError;
pub use logging::{init_logging, open_debug_log, LogConfig};

pub use posesync_protocol as protocol;
pub use posesync_session as session;
pub use posesync_tick as tick;
pub use posesync_transport as transport;

/// The types most applications need.
pub mod prelude {
    pub use crate::logging::{init_logging, LogConfig};
    pub use crate::PosesyncError;
    pub use posesync_protocol::{OpCode, PeerId};
    pub use posesync_session::{
        Client, ClientConfig, Forwarded, LocalState, PeerFactory, PoseSink,
        PoseSnapshot, SessionStatus, UpdateReport,
    };
    pub use posesync_transport::{Delivery, WebSocketConnector};
}

//! Session layer for posesync.
//!
//! This crate owns the one connection a client keeps to the relay server:
//!
//! 1. **Status** ([`SessionStatus`]): the connect/teardown state machine,
//!    driven by transport events through a pure transition function
//! 2. **Roster** ([`Roster`]): every remote peer and its pose sink
//! 3. **Dispatch** ([`dispatch`]): turns relayed frames into roster changes
//!    and pose playback
//! 4. **Sync** ([`SyncHandle`]): the background task that broadcasts the
//!    local pose once per tick
//!
//! [`Client`] ties them together.
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← calls Client::update() every frame
//!     ↕
//! Session Layer (this crate)  ← status, roster, sync task
//!     ↕
//! Protocol / Transport (below)  ← frames, codec, WebSocket
//! ```

mod client;
mod config;
mod dispatch;
mod error;
mod local;
mod roster;
mod status;
mod sync;
#[cfg(test)]
mod testing;

pub use client::{Client, UpdateReport};
pub use config::ClientConfig;
pub use dispatch::{dispatch, DropReason, Dispatched, Forwarded};
pub use error::SessionError;
pub use local::{LocalState, PeerFactory, PoseSink, PoseSnapshot};
pub use roster::{RemotePeer, Roster};
pub use status::{Action, SessionStatus, Transition};
pub use sync::{SyncHandle, SyncStats};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use posesync::prelude::*;
use rand::Rng;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "headless-client")]
#[command(about = "Streams a synthetic pose to a posesync relay server")]
struct Args {
    #[arg(long, default_value = "127.0.0.1", help = "Server host")]
    host: String,

    #[arg(short, long, default_value_t = 7777, help = "Server port")]
    port: u16,

    #[arg(short, long, default_value = "headless", help = "Username to join with")]
    username: String,

    #[arg(long, default_value_t = 30, help = "Pose broadcasts per second")]
    tick_rate: u32,

    #[arg(long, help = "Directory for the debug log file")]
    log_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Synthetic local player
// ---------------------------------------------------------------------------

struct Pose {
    timestamp: f32,
    bytes: Vec<u8>,
}

/// A "player" whose pose is random noise, resampled on every frame.
struct SyntheticPlayer {
    pose: Mutex<Pose>,
}

impl SyntheticPlayer {
    fn new() -> Self {
        Self {
            pose: Mutex::new(Pose {
                timestamp: 0.0,
                bytes: vec![0; 64],
            }),
        }
    }

    fn advance(&self, dt: f32) {
        let Ok(mut pose) = self.pose.lock() else {
            return;
        };
        pose.timestamp += dt;
        rand::rng().fill(&mut pose.bytes[..]);
    }
}

impl LocalState for SyntheticPlayer {
    fn current_timestamp(&self) -> f32 {
        self.pose.lock().map(|p| p.timestamp).unwrap_or_default()
    }

    fn serialize_pose(&self) -> PoseSnapshot {
        let bytes = self
            .pose
            .lock()
            .map(|p| p.bytes.clone())
            .unwrap_or_default();
        PoseSnapshot::new(bytes)
    }

    fn presentation_payload(&self) -> Option<Vec<u8>> {
        Some(b"headless".to_vec())
    }
}

/// Logs what a remote peer would be animating.
struct LoggingPuppet {
    peer: PeerId,
    poses: u64,
}

impl PoseSink for LoggingPuppet {
    fn apply_animation(&mut self, pose: Vec<u8>) {
        self.poses += 1;
        if self.poses % 100 == 1 {
            info!(peer = %self.peer, len = pose.len(), total = self.poses, "remote pose");
        }
    }

    fn on_removed(&mut self) {
        info!(peer = %self.peer, total = self.poses, "remote peer removed");
    }
}

// ---------------------------------------------------------------------------
// Main loop
// ---------------------------------------------------------------------------

const FRAME: Duration = Duration::from_millis(16);

#[tokio::main]
async fn main() -> Result<(), PosesyncError> {
    let args = Args::parse();

    init_logging(&LogConfig {
        debug_log_dir: args.log_dir.clone(),
        ..LogConfig::default()
    });

    let player = Arc::new(SyntheticPlayer::new());
    let config = ClientConfig {
        tick_rate: args.tick_rate,
        connect_timeout_ms: Some(5_000),
        ..ClientConfig::default()
    };
    let mut client = Client::with_config(
        config,
        WebSocketConnector::new(),
        Arc::clone(&player),
        |peer: PeerId| LoggingPuppet { peer, poses: 0 },
    );

    client.connect(&args.host, args.port, args.username.as_str())?;

    let mut frame = tokio::time::interval(FRAME);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            _ = frame.tick() => {
                player.advance(FRAME.as_secs_f32());

                let report = client.update().await;
                for message in &report.forwarded {
                    info!(opcode = %message.opcode, len = message.body.len(), "server message");
                }
                match report.status {
                    SessionStatus::Idle => {
                        info!("server closed the session");
                        break;
                    }
                    SessionStatus::Failed => {
                        warn!("connection failed");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(stats) = client.sync_stats() {
        info!(
            sent = stats.sent,
            suppressed = stats.suppressed,
            failed = stats.failed,
            peers = client.roster().len(),
            "shutting down"
        );
    }
    client.disconnect().await;
    Ok(())
}

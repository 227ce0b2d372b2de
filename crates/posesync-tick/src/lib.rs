//! Fixed-rate ticker for the posesync state broadcast.
//!
//! The synchronization task wakes once per tick, samples the local pose and
//! maybe sends it. A late wake-up never triggers a burst of catch-up ticks:
//! pose data is only worth sending once, so missed ticks are skipped and the
//! schedule restarts from "now".
//!
//! # Integration
//!
//! [`Ticker::wait_for_tick`] is cancel-safe and meant to sit in a
//! `tokio::select!` next to a stop signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = stop.changed() => break,
//!         info = ticker.wait_for_tick() => send_pose(info.tick).await,
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`Ticker`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second. Clamped to `1..=MAX_TICK_RATE_HZ`.
    pub tick_rate_hz: u32,
    /// Random delay (0–max µs) added to the first tick so clients that
    /// connect at the same instant do not send in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: Self::DEFAULT_TICK_RATE_HZ,
            initial_jitter_us: 0,
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_TICK_RATE_HZ: u32 = 128;
    /// Rate used when none is configured.
    pub const DEFAULT_TICK_RATE_HZ: u32 = 30;

    /// Config for a specific tick rate, no jitter.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps the rate into the supported range.
    pub fn validated(mut self) -> Self {
        if self.tick_rate_hz == 0 {
            warn!("tick_rate_hz is 0 — using 1");
            self.tick_rate_hz = 1;
        } else if self.tick_rate_hz > Self::MAX_TICK_RATE_HZ {
            warn!(
                rate = self.tick_rate_hz,
                max = Self::MAX_TICK_RATE_HZ,
                "tick_rate_hz exceeds maximum — clamping"
            );
            self.tick_rate_hz = Self::MAX_TICK_RATE_HZ;
        }
        self
    }

    /// Period between ticks (`1000 / tick_rate` ms).
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }
}

// ---------------------------------------------------------------------------
// Tick info and metrics
// ---------------------------------------------------------------------------

/// Information about one tick, returned by [`Ticker::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if the wake-up was more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods skipped because of the late wake-up.
    pub ticks_skipped: u64,
}

/// Counters accumulated by a [`Ticker`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Fixed-rate ticker with skip-ahead on overrun.
pub struct Ticker {
    period: Duration,
    tick_count: u64,
    next_tick: Instant,
    metrics: TickMetrics,
}

impl Ticker {
    /// Creates a ticker whose first tick is one period (plus jitter) away.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.tick_duration();

        let jitter = if config.initial_jitter_us > 0 {
            let us = rand::rng().random_range(0..config.initial_jitter_us);
            Duration::from_micros(us)
        } else {
            Duration::ZERO
        };

        debug!(
            rate_hz = config.tick_rate_hz,
            period_ms = period.as_secs_f64() * 1000.0,
            "ticker created"
        );

        Self {
            period,
            tick_count: 0,
            next_tick: Instant::now() + period + jitter,
            metrics: TickMetrics::default(),
        }
    }

    /// Creates a ticker for a specific rate with default settings.
    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next tick is due.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves the
    /// schedule untouched.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let due = self.next_tick;
        time::sleep_until(due).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > self.period / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / self.period.as_nanos()) as u64
        } else {
            0
        };
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick overrun — skipping ahead"
            );
        }

        // Always schedule from now, never from the missed deadline.
        self.next_tick = now + self.period;

        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;
        if overrun {
            self.metrics.total_overruns += 1;
        }

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Number of ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The period between ticks.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}

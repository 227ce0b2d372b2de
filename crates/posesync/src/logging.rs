//! Logging setup.
//!
//! Installs a `tracing-subscriber` fmt subscriber filtered by `RUST_LOG`
//! (falling back to [`LogConfig::filter`]) and, if a directory is given,
//! mirrors everything into a plain-text debug log there.
//!
//! The debug log is opened as `<base>.txt`. If that fails (another client
//! holds it, or it is not writable) the next candidates are `<base> 1.txt`,
//! `<base> 2.txt` and so on, up to [`MAX_LOG_ATTEMPTS`] names. Not getting a
//! log file is never fatal.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::PosesyncError;

/// How many file names [`open_debug_log`] tries before giving up.
pub const MAX_LOG_ATTEMPTS: usize = 10;

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"posesync_session=debug"`.
    pub filter: String,
    /// Directory for the debug log file. `None` disables the file.
    pub debug_log_dir: Option<PathBuf>,
    /// File name stem of the debug log.
    pub debug_log_base: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            debug_log_dir: None,
            debug_log_base: "posesync debug client".to_string(),
        }
    }
}

/// Candidate file name for the given attempt.
fn log_file_name(base: &str, attempt: usize) -> String {
    if attempt == 0 {
        format!("{base}.txt")
    } else {
        format!("{base} {attempt}.txt")
    }
}

/// Opens the first debug log file in `dir` that can be opened for append.
///
/// # Errors
/// [`PosesyncError::Log`] with the last I/O error if every candidate fails.
pub fn open_debug_log(
    dir: &Path,
    base: &str,
) -> Result<(File, PathBuf), PosesyncError> {
    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no attempts made");
    for attempt in 0..MAX_LOG_ATTEMPTS {
        let path = dir.join(log_file_name(base, attempt));
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) => last_err = e,
        }
    }
    Err(PosesyncError::Log(last_err))
}

/// Installs the global subscriber.
///
/// Returns the debug log path if one was opened. Calling this when a
/// subscriber is already installed leaves the existing one in place.
pub fn init_logging(config: &LogConfig) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let opened = config
        .debug_log_dir
        .as_deref()
        .map(|dir| open_debug_log(dir, &config.debug_log_base));

    let (file_layer, path, open_err) = match opened {
        Some(Ok((file, path))) => {
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), Some(path), None)
        }
        Some(Err(e)) => (None, None, Some(e)),
        None => (None, None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init();

    if installed.is_err() {
        warn!("a tracing subscriber is already installed; keeping it");
        return None;
    }
    if let Some(e) = open_err {
        warn!(error = %e, "continuing without a debug log file");
    }
    if let Some(path) = &path {
        info!(path = %path.display(), "writing debug log");
    }
    path
}

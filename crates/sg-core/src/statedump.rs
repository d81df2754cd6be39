//! Statedump coordination.
//!
//! Storage-service daemons write diagnostic statedump files when they
//! receive SIGUSR1. There is no acknowledgment channel: we signal every
//! matching process, give the writers a short grace period, then treat
//! the dump directory listing as the authoritative set of expected
//! entries. Each entry is complete once its last line carries the
//! `DUMP_END_TIME` marker.
//!
//! The wait is bounded: polling uses exponential backoff up to a
//! configurable attempt budget, and exhaustion surfaces as a recoverable
//! [`StatedumpError::Timeout`] rather than a hang when a writer crashes
//! mid-dump.

use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Terminal marker line token written at the end of a complete dump.
pub const DUMP_MARKER: &str = "DUMP_END_TIME";

/// Errors from statedump coordination.
#[derive(Debug, Error)]
pub enum StatedumpError {
    #[error("statedump {file} did not complete within {attempts} polls")]
    Timeout { file: String, attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Polling bounds for the statedump wait.
#[derive(Debug, Clone)]
pub struct WaitPolicy {
    /// Grace period between signaling and the first directory listing.
    pub grace: Duration,
    /// Maximum polls per dump file.
    pub max_attempts: u32,
    /// First backoff; doubles per attempt.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(1),
            max_attempts: 50,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl WaitPolicy {
    /// Derive an attempt budget from a wall-clock budget in seconds,
    /// keeping the default backoff shape.
    pub fn with_budget_secs(secs: u64) -> Self {
        let base = Self::default();
        let mut total = Duration::ZERO;
        let mut backoff = base.initial_backoff;
        let mut attempts = 0u32;
        while total < Duration::from_secs(secs.max(1)) {
            total += backoff;
            backoff = (backoff * 2).min(base.max_backoff);
            attempts += 1;
        }
        Self {
            max_attempts: attempts,
            ..base
        }
    }
}

/// Send `signum` to every process whose command name is in `names`.
/// Fire and forget; returns how many processes were signaled.
#[cfg(target_os = "linux")]
pub fn signal_processes_by_name(names: &[&str], signum: i32) -> usize {
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return 0;
    };
    let mut signaled = 0;
    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<i32>().ok())
        else {
            continue;
        };
        let Ok(comm) = std::fs::read_to_string(entry.path().join("comm")) else {
            continue;
        };
        if names.contains(&comm.trim()) {
            let rc = unsafe { libc::kill(pid, signum) };
            if rc == 0 {
                debug!(pid, comm = comm.trim(), "signaled");
                signaled += 1;
            }
        }
    }
    signaled
}

#[cfg(not(target_os = "linux"))]
pub fn signal_processes_by_name(_names: &[&str], _signum: i32) -> usize {
    0
}

/// Block until every file currently in `dir` carries the terminal
/// marker, within the policy's bounds. Returns the number of complete
/// dumps. The directory is listed exactly once: dumps that start after
/// the listing are not waited for.
pub fn wait_for_statedumps(dir: &Path, policy: &WaitPolicy) -> Result<usize, StatedumpError> {
    let entries: Vec<_> = std::fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();

    for path in &entries {
        wait_for_entry(path, policy)?;
    }
    info!(dumps = entries.len(), dir = %dir.display(), "statedumps complete");
    Ok(entries.len())
}

/// `AwaitingTerminalLine -> Complete`, or a timeout error.
fn wait_for_entry(path: &Path, policy: &WaitPolicy) -> Result<(), StatedumpError> {
    let mut backoff = policy.initial_backoff;
    for attempt in 1..=policy.max_attempts {
        if last_line_has_marker(path)? {
            debug!(file = %path.display(), attempt, "dump complete");
            return Ok(());
        }
        std::thread::sleep(backoff);
        backoff = (backoff * 2).min(policy.max_backoff);
    }
    Err(StatedumpError::Timeout {
        file: path.display().to_string(),
        attempts: policy.max_attempts,
    })
}

fn last_line_has_marker(path: &Path) -> Result<bool, StatedumpError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .last()
        .is_some_and(|line| line.contains(DUMP_MARKER)))
}

//! Runtimeout enforcement against a busy run lock
//!
//! Invoked only when acquisition observed a busy lock and a nonzero timeout
//! budget is configured. Decides whether the holder has outlived its budget
//! and, if so, terminates it and polls for it to disappear. Enforcement is
//! infallible: every branch resolves to one of the two decisions.

use std::thread;
use std::time::{Duration, SystemTime};

use crate::lock::RunLock;

/// Number of existence probes after a termination attempt
const EXIT_POLL_ATTEMPTS: u32 = 5;

/// Delay between existence probes
const EXIT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Decision produced by a single enforcement pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforcement {
    /// The lock is believed reclaimable; re-attempt acquisition now
    RetryNow,
    /// The lock is fresh, or the holder survived enforcement; skip this run
    StillBusy,
}

/// Enforces the runtimeout budget against a stale lock holder
#[derive(Debug, Clone)]
pub struct TimeoutEnforcer {
    timeout: Duration,
}

impl TimeoutEnforcer {
    /// Create an enforcer for a nonzero timeout budget
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Decide whether the holder of `lock` may be reclaimed.
    ///
    /// The holder's budget is measured from the lock artifact's mtime, which
    /// is fixed at acquisition. A holder past its budget gets a graceful
    /// terminate, then up to five one-second existence probes; one that
    /// never disappears is reported and left alone.
    #[must_use]
    pub fn enforce(&self, lock: &RunLock) -> Enforcement {
        let Some(pid) = lock.holder_pid() else {
            // Holder already gone or mid-release; safe to retry immediately.
            // An artifact past its budget that cannot name a holder is junk
            // and would stall every future retry; clear it.
            if lock
                .artifact_mtime()
                .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
                .is_some_and(|held| held >= self.timeout)
            {
                lock.remove_stale_artifact();
            }
            return Enforcement::RetryNow;
        };

        let Some(mtime) = lock.artifact_mtime() else {
            // Artifact vanished between check and stat.
            return Enforcement::RetryNow;
        };

        let held = SystemTime::now()
            .duration_since(mtime)
            .unwrap_or(Duration::ZERO);
        if held < self.timeout {
            // Still time to live, even if the holder happens to be dead.
            return Enforcement::StillBusy;
        }

        if matches!(terminate(pid, self.timeout, lock), Terminate::AlreadyGone) {
            reclaim_from(lock, pid);
            return Enforcement::RetryNow;
        }

        for _ in 0..EXIT_POLL_ATTEMPTS {
            if !process_exists(pid) {
                reclaim_from(lock, pid);
                return Enforcement::RetryNow;
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }

        tracing::error!(
            pid,
            "run holder did not exit within {EXIT_POLL_ATTEMPTS} seconds of being killed"
        );
        Enforcement::StillBusy
    }
}

/// Remove the dead holder's artifact on its behalf.
///
/// A terminated holder gets no chance to clean up its own artifact.
/// Re-reads the artifact first: a competing enforcer may have reclaimed
/// the path in the meantime, in which case the file now belongs to a new
/// live holder and must be left alone.
fn reclaim_from(lock: &RunLock, dead_pid: u32) {
    if lock.holder_pid() == Some(dead_pid) {
        lock.remove_stale_artifact();
    }
}

/// What a termination attempt learned about the holder
enum Terminate {
    /// Signal dispatched; existence must be confirmed by polling
    Delivered,
    /// The holder no longer exists
    AlreadyGone,
}

#[cfg(unix)]
fn terminate(pid: u32, timeout: Duration, lock: &RunLock) -> Terminate {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    tracing::error!(
        pid,
        lock = %lock.path().display(),
        "run holder has been holding the lock for longer than {} seconds; sending SIGTERM",
        timeout.as_secs()
    );

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Err(Errno::ESRCH) => Terminate::AlreadyGone,
        // Delivery failures other than "no such process" carry no liveness
        // information; fall through to polling.
        _ => Terminate::Delivered,
    }
}

#[cfg(not(unix))]
fn terminate(pid: u32, timeout: Duration, lock: &RunLock) -> Terminate {
    tracing::error!(
        pid,
        lock = %lock.path().display(),
        "run holder has been holding the lock for longer than {} seconds; invoking taskkill",
        timeout.as_secs()
    );

    // /T propagates the kill to child processes that may be blocking the
    // holder. The reported status carries no existence information, so the
    // polling loop decides either way.
    let _ = std::process::Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid.to_string()])
        .status();
    Terminate::Delivered
}

/// Probe a pid for existence with a zero-effect signal
#[cfg(unix)]
fn process_exists(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    !matches!(kill(Pid::from_raw(pid as i32), None), Err(Errno::ESRCH))
}

#[cfg(not(unix))]
fn process_exists(pid: u32) -> bool {
    // tasklist emits a CSV row quoting the pid when it exists and an
    // informational message when it does not.
    let filter = format!("PID eq {pid}");
    match std::process::Command::new("tasklist")
        .args(["/FI", &filter, "/NH", "/FO", "CSV"])
        .output()
    {
        Ok(output) => {
            String::from_utf8_lossy(&output.stdout).contains(&format!("\"{pid}\""))
        }
        // No existence information; report alive and let the poll budget
        // decide.
        Err(_) => true,
    }
}

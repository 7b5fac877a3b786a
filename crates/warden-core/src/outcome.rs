//! Typed results of a single supervised run

use std::fmt;
use std::path::PathBuf;

/// Why a run was skipped without producing a work result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Another run holds the lock
    AlreadyRunning {
        /// The lock artifact that blocked this run
        lock_path: PathBuf,
    },
    /// The run coordinator reported shutdown or restart pending
    CoordinatorBusy,
    /// The work unit could not be constructed
    ClientInit,
    /// The bounded child wait elapsed; the child still runs and still holds
    /// the lock. A later invocation's enforcement path reclaims it.
    RunTimeout,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning { lock_path } => {
                write!(f, "run already in progress ({} exists)", lock_path.display())
            }
            Self::CoordinatorBusy => write!(f, "shutdown/restart in progress"),
            Self::ClientInit => write!(f, "run client could not be created"),
            Self::RunTimeout => write!(f, "run did not finish within the timeout"),
        }
    }
}

/// Result of one controller invocation.
///
/// Produced once per invocation and handed back to the caller, which maps
/// it to a process exit code and log messages. `UncontrolledExit` and
/// `OutOfMemory` pass through the controller untouched; everything else is
/// a contained result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The work completed with its own exit code
    Completed(i32),
    /// The isolated child terminated abnormally
    UncontrolledExit,
    /// The isolated child exhausted memory
    OutOfMemory,
    /// The run was skipped
    Skipped(SkipReason),
    /// The work raised a non-fatal error; contained and reported
    Failed(String),
    /// The agent is administratively disabled
    Disabled {
        /// The operator-supplied reason
        message: String,
    },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(code) => write!(f, "completed with exit code {code}"),
            Self::UncontrolledExit => write!(f, "uncontrolled exit"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Disabled { message } => write!(f, "disabled: {message}"),
        }
    }
}

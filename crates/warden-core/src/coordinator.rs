//! Process-wide run gating
//!
//! The coordinator is an injected gate that grants or denies permission to
//! start a run based on process-wide shutdown or restart intent. The core
//! only ever reads it; whoever embeds the agent owns the transitions.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Externally owned run status consulted before starting a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No run in progress and nothing pending
    Idle,
    /// A run is in progress
    Running,
    /// Shutdown is pending; no new runs may start
    ShuttingDown,
    /// A restart was requested; no new runs may start
    RestartRequested,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::ShuttingDown => write!(f, "shutting-down"),
            Self::RestartRequested => write!(f, "restart-requested"),
        }
    }
}

/// Gate consulted by the controller before any lock interaction
pub trait RunCoordinator {
    /// Current status, for log lines
    fn status(&self) -> RunStatus;

    /// Whether shutdown is pending
    fn is_shutting_down(&self) -> bool {
        self.status() == RunStatus::ShuttingDown
    }

    /// Whether a restart was requested
    fn is_restart_requested(&self) -> bool {
        self.status() == RunStatus::RestartRequested
    }

    /// Try to enter the run-permitted region. Denied while shutdown or
    /// restart is pending, or while another run holds the region.
    fn try_enter(&self) -> bool;

    /// Leave the region entered by a successful `try_enter`
    fn leave(&self);
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const SHUTTING_DOWN: u8 = 2;
const RESTART_REQUESTED: u8 = 3;

/// Atomic process-wide coordinator
#[derive(Debug, Default)]
pub struct ProcessCoordinator {
    state: AtomicU8,
}

impl ProcessCoordinator {
    /// Create a coordinator in the idle state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark shutdown pending; every later `try_enter` is denied
    pub fn request_shutdown(&self) {
        self.state.store(SHUTTING_DOWN, Ordering::SeqCst);
    }

    /// Mark a restart requested; every later `try_enter` is denied
    pub fn request_restart(&self) {
        self.state.store(RESTART_REQUESTED, Ordering::SeqCst);
    }
}

impl RunCoordinator for ProcessCoordinator {
    fn status(&self) -> RunStatus {
        match self.state.load(Ordering::SeqCst) {
            RUNNING => RunStatus::Running,
            SHUTTING_DOWN => RunStatus::ShuttingDown,
            RESTART_REQUESTED => RunStatus::RestartRequested,
            _ => RunStatus::Idle,
        }
    }

    fn try_enter(&self) -> bool {
        self.state
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn leave(&self) {
        // Only the running state transitions back; pending shutdown or
        // restart set mid-run must survive the run's exit.
        let _ = self
            .state
            .compare_exchange(RUNNING, IDLE, Ordering::SeqCst, Ordering::SeqCst);
    }
}

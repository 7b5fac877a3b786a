//! Execution strategies for the supervised run
//!
//! The work either runs directly in this process or inside an isolated
//! child whose exit status carries the result back through a small sentinel
//! contract. Isolation keeps a misbehaving run from ever taking the
//! supervising process down with it.

use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::outcome::RunOutcome;

/// Exit status an isolated child reports for an abnormal termination of the
/// work. Wait-status image of exiting with -1.
pub const EXIT_UNCONTROLLED: i32 = 255;

/// Exit status an isolated child reports for memory exhaustion. Wait-status
/// image of exiting with -2.
pub const EXIT_OUT_OF_MEMORY: i32 = 254;

/// Interval between child wait polls under a deadline
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How to relaunch this agent in the child role
#[derive(Debug, Clone)]
pub struct ChildCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ChildCommand {
    /// Child command for an explicit program and arguments
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Child command that relaunches the current executable with `args`.
    ///
    /// # Errors
    ///
    /// Returns an error if the current executable path cannot be resolved.
    pub fn current_exe(args: Vec<String>) -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| Error::Isolation {
            reason: format!("cannot resolve current executable: {e}"),
        })?;
        Ok(Self { program, args })
    }

    /// Program the child command launches
    #[must_use]
    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

/// Selected execution strategy for the run
#[derive(Debug, Clone)]
pub enum ExecutionStrategy {
    /// Run the work synchronously in this process
    InProcess,
    /// Run the work in an isolated child process. The child performs the
    /// lock acquisition and release; the parent only waits and decodes.
    Isolated(ChildCommand),
}

/// What the bounded child wait observed
#[derive(Debug)]
pub enum ChildVerdict {
    /// The child exited and its status decoded to an outcome
    Exited(RunOutcome),
    /// The deadline elapsed first. The child keeps running and keeps the
    /// lock; reclaiming it is the timeout enforcer's job on a later run,
    /// never this wait's.
    StillRunning {
        /// Pid of the still-running child
        pid: u32,
    },
}

/// Spawn the child role and wait for it, bounded by `deadline` if given.
///
/// No signal is ever sent to the child from here, deadline or not.
///
/// # Errors
///
/// Returns an error if the child cannot be spawned or awaited.
pub fn supervise(cmd: &ChildCommand, deadline: Option<Duration>) -> Result<ChildVerdict> {
    let mut child = Command::new(&cmd.program)
        .args(&cmd.args)
        .spawn()
        .map_err(|e| Error::Isolation {
            reason: format!("failed to spawn child run: {e}"),
        })?;
    let pid = child.id();
    tracing::debug!(pid, "spawned isolated run child");

    let Some(deadline) = deadline else {
        let status = child.wait().map_err(|e| Error::Isolation {
            reason: format!("failed to wait for child run: {e}"),
        })?;
        return Ok(ChildVerdict::Exited(decode_exit(status)));
    };

    let started = Instant::now();
    loop {
        let waited = child.try_wait().map_err(|e| Error::Isolation {
            reason: format!("failed to wait for child run: {e}"),
        })?;
        match waited {
            Some(status) => return Ok(ChildVerdict::Exited(decode_exit(status))),
            None if started.elapsed() >= deadline => {
                tracing::warn!(
                    pid,
                    "child run did not finish within {} seconds; leaving it running",
                    deadline.as_secs()
                );
                return Ok(ChildVerdict::StillRunning { pid });
            }
            None => thread::sleep(WAIT_POLL_INTERVAL),
        }
    }
}

/// Decode a child exit status into a typed outcome
#[must_use]
pub fn decode_exit(status: ExitStatus) -> RunOutcome {
    match status.code() {
        Some(EXIT_UNCONTROLLED) => RunOutcome::UncontrolledExit,
        Some(EXIT_OUT_OF_MEMORY) => RunOutcome::OutOfMemory,
        Some(code) => RunOutcome::Completed(code),
        // Killed by a signal before reporting a status.
        None => RunOutcome::UncontrolledExit,
    }
}

/// Exit code a process reports for an outcome of its own run
#[must_use]
pub fn exit_code_for(outcome: &RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Completed(code) => *code,
        RunOutcome::UncontrolledExit => EXIT_UNCONTROLLED,
        RunOutcome::OutOfMemory => EXIT_OUT_OF_MEMORY,
        RunOutcome::Failed(_) => 1,
        RunOutcome::Skipped(_) | RunOutcome::Disabled { .. } => 0,
    }
}

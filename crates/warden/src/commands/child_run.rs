//! Child role of an isolated run
//!
//! Runs the lock-holding path in-process and reports the result through
//! the exit-status sentinel contract: the work's own exit code on a
//! controlled run, 255 for an abnormal termination, 254 for memory
//! exhaustion. Everything abnormal must be caught here; the exit status is
//! the only channel back to the supervising parent.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use warden_core::{
    exec, Agent, AgentConfig, ExecutionStrategy, ProcessCoordinator, EXIT_UNCONTROLLED,
};

use crate::client::CommandClient;

/// Child-run command options
#[derive(Debug, Clone)]
pub struct ChildRunOptions {
    /// Run lock path handed down by the parent
    pub lockfile: PathBuf,
    /// Timeout budget handed down by the parent, in seconds
    pub runtimeout: u64,
    /// Apply command to run
    pub command: Vec<String>,
}

/// Run the child role. Infallible: every failure maps to an exit status.
#[must_use]
pub fn run(options: &ChildRunOptions) -> i32 {
    let config = AgentConfig {
        lockfile: options.lockfile.clone(),
        runtimeout: options.runtimeout,
        isolate: false,
        apply_command: options.command.clone(),
        ..AgentConfig::default()
    };
    let coordinator = ProcessCoordinator::new();
    let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        agent.run_locked(|| CommandClient::from_command(&config.apply_command))
    }));
    match result {
        Ok(Ok(outcome)) => exec::exit_code_for(&outcome),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "child run failed");
            EXIT_UNCONTROLLED
        }
        Err(_) => EXIT_UNCONTROLLED,
    }
}

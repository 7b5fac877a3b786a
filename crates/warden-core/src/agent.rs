//! The run controller
//!
//! Decides whether a run may start, isolates it, and supervises it. One
//! invocation produces one [`RunOutcome`]. Everything non-fatal is
//! contained here: a misbehaving work unit can fail its own run but never
//! the supervising process. The two child sentinels, uncontrolled exit and
//! memory exhaustion, pass through untouched for the caller to translate.

use std::time::Duration;

use crate::config::AgentConfig;
use crate::coordinator::RunCoordinator;
use crate::disable::Disabler;
use crate::enforce::{Enforcement, TimeoutEnforcer};
use crate::error::{Error, Result};
use crate::exec::{self, ChildVerdict, ExecutionStrategy};
use crate::lock::{Acquisition, RunLock};
use crate::outcome::{RunOutcome, SkipReason};
use crate::splay::Splayer;

/// The opaque work unit: applying a configuration catalog
pub trait ConfigClient {
    /// Perform one run, returning the work's own exit code.
    ///
    /// # Errors
    ///
    /// A non-fatal failure of the run; contained by the controller. The
    /// one exception is [`Error::OutOfMemory`], which is never contained.
    fn run(&mut self) -> Result<i32>;
}

/// Top-level run controller for one agent
pub struct Agent<'a> {
    lock: RunLock,
    disabler: Disabler,
    splayer: Splayer,
    enforcer: Option<TimeoutEnforcer>,
    runtimeout: Duration,
    strategy: ExecutionStrategy,
    coordinator: &'a dyn RunCoordinator,
}

impl<'a> Agent<'a> {
    /// Assemble a controller from configuration and injected collaborators
    #[must_use]
    pub fn new(
        config: &AgentConfig,
        strategy: ExecutionStrategy,
        coordinator: &'a dyn RunCoordinator,
    ) -> Self {
        let runtimeout = config.run_timeout();
        Self {
            lock: RunLock::new(&config.lockfile),
            disabler: Disabler::new(&config.disabled_lockfile),
            splayer: Splayer::new(config.splay_limit()),
            enforcer: (!runtimeout.is_zero()).then(|| TimeoutEnforcer::new(runtimeout)),
            runtimeout,
            strategy,
            coordinator,
        }
    }

    /// The lock this agent guards its runs with
    #[must_use]
    pub fn lock(&self) -> &RunLock {
        &self.lock
    }

    /// Perform one supervised run.
    ///
    /// Checks disablement, gates on the coordinator, applies the splay
    /// delay, and drives the configured execution strategy. Contained
    /// failures come back as `Skipped` or `Failed` outcomes with exactly
    /// one log line each; no run disappears silently.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure failures of the supervisor
    /// itself (unwritable lock path, unreadable disablement artifact,
    /// unspawnable child), never for failures of the work.
    pub fn run<F, C>(&self, make_client: F) -> Result<RunOutcome>
    where
        F: FnOnce() -> Result<C>,
        C: ConfigClient,
    {
        if let Some(message) = self.disabler.disabled_message()? {
            tracing::info!(
                "skipping run; administratively disabled (reason: '{message}'); \
                 use 'warden enable' to re-enable"
            );
            return Ok(RunOutcome::Disabled { message });
        }

        if !self.coordinator.try_enter() {
            tracing::info!(
                status = %self.coordinator.status(),
                "shutdown/restart in progress; skipping run"
            );
            return Ok(RunOutcome::Skipped(SkipReason::CoordinatorBusy));
        }

        let result = self.gated_run(make_client);
        self.coordinator.leave();
        result
    }

    /// The portion of a run that executes inside the coordinator gate
    fn gated_run<F, C>(&self, make_client: F) -> Result<RunOutcome>
    where
        F: FnOnce() -> Result<C>,
        C: ConfigClient,
    {
        self.splayer.splay();

        match &self.strategy {
            ExecutionStrategy::InProcess => self.run_locked(make_client),
            ExecutionStrategy::Isolated(child) => {
                // The child role acquires and releases the lock; if the
                // deadline elapses, the child keeps both running and the
                // lock, and a later invocation's enforcement reclaims it.
                let deadline = (!self.runtimeout.is_zero()).then_some(self.runtimeout);
                match exec::supervise(child, deadline)? {
                    ChildVerdict::Exited(outcome) => Ok(outcome),
                    ChildVerdict::StillRunning { .. } => {
                        Ok(RunOutcome::Skipped(SkipReason::RunTimeout))
                    }
                }
            }
        }
    }

    /// The lock-holding run path.
    ///
    /// In isolated mode this executes inside the child role; in-process
    /// mode calls it directly. Acquires the lock, retrying through timeout
    /// enforcement on contention, runs the client, and releases the lock on
    /// every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error for lock-artifact I/O failures only.
    pub fn run_locked<F, C>(&self, make_client: F) -> Result<RunOutcome>
    where
        F: FnOnce() -> Result<C>,
        C: ConfigClient,
    {
        let mut client = match make_client() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "could not create run client");
                return Ok(RunOutcome::Skipped(SkipReason::ClientInit));
            }
        };

        loop {
            match self.lock.try_acquire()? {
                Acquisition::Acquired(guard) => {
                    let result = client.run();
                    return match result {
                        Ok(code) => {
                            guard.release()?;
                            Ok(RunOutcome::Completed(code))
                        }
                        Err(Error::OutOfMemory) => {
                            drop(guard);
                            Ok(RunOutcome::OutOfMemory)
                        }
                        Err(e) => {
                            drop(guard);
                            tracing::error!(error = %e, "could not run configuration client");
                            Ok(RunOutcome::Failed(e.to_string()))
                        }
                    };
                }
                Acquisition::Busy => {
                    let Some(enforcer) = &self.enforcer else {
                        return Ok(self.skip_already_running());
                    };
                    match enforcer.enforce(&self.lock) {
                        // Unbounded on purpose: each pass either reclaims a
                        // provably stale lock or resolves to StillBusy.
                        Enforcement::RetryNow => continue,
                        Enforcement::StillBusy => return Ok(self.skip_already_running()),
                    }
                }
            }
        }
    }

    fn skip_already_running(&self) -> RunOutcome {
        tracing::info!(
            "run already in progress; skipping ({} exists)",
            self.lock.path().display()
        );
        RunOutcome::Skipped(SkipReason::AlreadyRunning {
            lock_path: self.lock.path().to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::coordinator::ProcessCoordinator;
    use tempfile::TempDir;

    struct FnClient<F: FnMut() -> Result<i32>>(F);

    impl<F: FnMut() -> Result<i32>> ConfigClient for FnClient<F> {
        fn run(&mut self) -> Result<i32> {
            (self.0)()
        }
    }

    fn test_config(dir: &TempDir) -> AgentConfig {
        AgentConfig {
            lockfile: dir.path().join("run.lock"),
            disabled_lockfile: dir.path().join("agent.disabled"),
            ..AgentConfig::default()
        }
    }

    #[test]
    fn test_successful_run_completes_and_releases_lock() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let coordinator = ProcessCoordinator::new();
        let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);

        let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();
        assert_eq!(outcome, RunOutcome::Completed(0));
        assert!(!config.lockfile.exists());
    }

    #[test]
    fn test_work_exit_code_passes_through() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let coordinator = ProcessCoordinator::new();
        let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);

        let outcome = agent.run(|| Ok(FnClient(|| Ok(2)))).unwrap();
        assert_eq!(outcome, RunOutcome::Completed(2));
    }

    #[test]
    fn test_disabled_agent_skips_without_touching_lock() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        Disabler::new(&config.disabled_lockfile)
            .disable("maintenance")
            .unwrap();

        let coordinator = ProcessCoordinator::new();
        let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);

        let outcome = agent
            .run(|| {
                Ok(FnClient(|| {
                    panic!("client must not run while disabled")
                }))
            })
            .unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Disabled {
                message: "maintenance".to_string()
            }
        );
        assert!(
            !config.lockfile.exists(),
            "no lock artifact may be created while disabled"
        );
    }

    #[test]
    fn test_coordinator_shutdown_skips_without_lock_interaction() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let coordinator = ProcessCoordinator::new();
        coordinator.request_shutdown();

        let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);
        let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();

        assert_eq!(outcome, RunOutcome::Skipped(SkipReason::CoordinatorBusy));
        assert!(!config.lockfile.exists());
    }

    #[test]
    fn test_busy_lock_without_timeout_budget_skips() {
        // Scenario: runtimeout = 0 means no enforcement is ever attempted.
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        std::fs::write(&config.lockfile, "12345").unwrap();

        let coordinator = ProcessCoordinator::new();
        let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);

        let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Skipped(SkipReason::AlreadyRunning {
                lock_path: config.lockfile.clone()
            })
        );
        assert!(config.lockfile.exists(), "foreign lock must be left alone");
    }

    #[test]
    fn test_client_failure_is_contained() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let coordinator = ProcessCoordinator::new();
        let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);

        let outcome = agent
            .run(|| {
                Ok(FnClient(|| {
                    Err(Error::ClientRun {
                        reason: "catalog application blew up".to_string(),
                    })
                }))
            })
            .unwrap();

        assert!(matches!(outcome, RunOutcome::Failed(_)));
        assert!(!config.lockfile.exists(), "lock released on the error path");
    }

    #[test]
    fn test_client_init_failure_is_contained() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let coordinator = ProcessCoordinator::new();
        let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);

        let outcome = agent
            .run(|| {
                Err::<FnClient<fn() -> Result<i32>>, _>(Error::ClientInit {
                    reason: "no client".to_string(),
                })
            })
            .unwrap();

        assert_eq!(outcome, RunOutcome::Skipped(SkipReason::ClientInit));
        assert!(!config.lockfile.exists());
    }

    #[test]
    fn test_out_of_memory_is_not_contained() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let coordinator = ProcessCoordinator::new();
        let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);

        let outcome = agent.run(|| Ok(FnClient(|| Err(Error::OutOfMemory)))).unwrap();
        assert_eq!(outcome, RunOutcome::OutOfMemory);
        assert!(!config.lockfile.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_lock_is_reclaimed_and_run_proceeds() {
        // A dead holder past its budget is cleared and the run goes ahead.
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.runtimeout = 1;

        let mut gone = std::process::Command::new("true").spawn().unwrap();
        let dead_pid = gone.id();
        gone.wait().unwrap();
        std::fs::write(&config.lockfile, dead_pid.to_string()).unwrap();

        // Age the artifact past the one-second budget.
        std::thread::sleep(Duration::from_millis(1100));

        let coordinator = ProcessCoordinator::new();
        let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);
        let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();

        assert_eq!(outcome, RunOutcome::Completed(0));
        assert!(!config.lockfile.exists());
    }
}

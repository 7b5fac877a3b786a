//! End-to-end controller scenarios against real processes and artifacts
//!
//! Exercises the full path from a controller invocation down to lock
//! artifacts on disk and, where signals are available, real stale holders
//! being terminated and reclaimed.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use tempfile::TempDir;
use warden_core::{
    Agent, AgentConfig, ChildCommand, ConfigClient, ExecutionStrategy, ProcessCoordinator,
    Result, RunOutcome, SkipReason,
};

struct FnClient<F: FnMut() -> Result<i32>>(F);

impl<F: FnMut() -> Result<i32>> ConfigClient for FnClient<F> {
    fn run(&mut self) -> Result<i32> {
        (self.0)()
    }
}

fn config_in(dir: &TempDir) -> AgentConfig {
    AgentConfig {
        lockfile: dir.path().join("run.lock"),
        disabled_lockfile: dir.path().join("agent.disabled"),
        ..AgentConfig::default()
    }
}

fn sh(script: &str) -> ChildCommand {
    ChildCommand::new("sh", vec!["-c".to_string(), script.to_string()])
}

// A holder past its budget is terminated, its artifact reclaimed, and the
// blocked run proceeds in the same invocation.
#[cfg(unix)]
#[test]
fn stale_live_holder_is_terminated_and_run_proceeds() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.runtimeout = 1;

    let mut holder = std::process::Command::new("sleep")
        .arg("60")
        .spawn()
        .expect("spawn sleep");
    std::fs::write(&config.lockfile, holder.id().to_string()).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1100));

    // Reap concurrently: an unreaped child lingers as a zombie that the
    // existence probe still counts as alive, which a real (non-child)
    // stale holder never would.
    let reaper = std::thread::spawn(move || holder.wait());

    let coordinator = ProcessCoordinator::new();
    let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);
    let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();

    assert_eq!(outcome, RunOutcome::Completed(0));
    assert!(!config.lockfile.exists(), "lock released after the new run");
    assert!(!reaper.join().expect("join reaper").expect("reap holder").success());
}

// With no timeout budget a busy lock is final: skip, touch nothing.
#[test]
fn busy_lock_without_budget_is_skipped_and_untouched() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    std::fs::write(&config.lockfile, "999999").unwrap();

    let coordinator = ProcessCoordinator::new();
    let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);
    let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Skipped(SkipReason::AlreadyRunning {
            lock_path: config.lockfile.clone()
        })
    );
    assert_eq!(
        std::fs::read_to_string(&config.lockfile).unwrap(),
        "999999"
    );
}

// A fresh holder inside its budget is never disturbed, alive or not.
#[cfg(unix)]
#[test]
fn fresh_holder_within_budget_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.runtimeout = 3600;

    let mut gone = std::process::Command::new("true").spawn().unwrap();
    let dead_pid = gone.id();
    gone.wait().unwrap();
    std::fs::write(&config.lockfile, dead_pid.to_string()).unwrap();

    let coordinator = ProcessCoordinator::new();
    let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);
    let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Skipped(SkipReason::AlreadyRunning { .. })
    ));
    assert!(config.lockfile.exists());
}

// A work-unit failure is contained: the controller returns an outcome, the
// lock is released, and the supervisor survives to run again.
#[test]
fn contained_failure_releases_lock_and_next_run_succeeds() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let coordinator = ProcessCoordinator::new();
    let agent = Agent::new(&config, ExecutionStrategy::InProcess, &coordinator);

    let outcome = agent
        .run(|| {
            Ok(FnClient(|| {
                Err(warden_core::Error::ClientRun {
                    reason: "apply blew up".to_string(),
                })
            }))
        })
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Failed(_)));
    assert!(!config.lockfile.exists());

    let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();
    assert_eq!(outcome, RunOutcome::Completed(0));
}

// Sentinel statuses from an isolated child reach the caller untouched.
#[cfg(unix)]
#[test]
fn isolated_child_sentinels_pass_through() {
    let dir = TempDir::new().unwrap();
    let config = config_in(&dir);
    let coordinator = ProcessCoordinator::new();

    let agent = Agent::new(
        &config,
        ExecutionStrategy::Isolated(sh("exit 255")),
        &coordinator,
    );
    let outcome = agent
        .run(|| Ok(FnClient(|| unreachable!("parent must not run the work"))))
        .unwrap();
    assert_eq!(outcome, RunOutcome::UncontrolledExit);

    let agent = Agent::new(
        &config,
        ExecutionStrategy::Isolated(sh("exit 254")),
        &coordinator,
    );
    let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();
    assert_eq!(outcome, RunOutcome::OutOfMemory);
}

// A bounded child wait that elapses produces a skip; the child is left
// running and unsignalled.
#[cfg(unix)]
#[test]
fn isolated_child_outliving_the_wait_is_a_timeout_skip() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(&dir);
    config.runtimeout = 1;
    let coordinator = ProcessCoordinator::new();

    let agent = Agent::new(
        &config,
        ExecutionStrategy::Isolated(sh("sleep 37")),
        &coordinator,
    );
    let outcome = agent.run(|| Ok(FnClient(|| Ok(0)))).unwrap();
    assert_eq!(outcome, RunOutcome::Skipped(SkipReason::RunTimeout));

    // The controller left the sleeper running on purpose; reap it so the
    // test run does not leak it.
    let _ = std::process::Command::new("pkill")
        .args(["-f", "sleep 37"])
        .status();
}

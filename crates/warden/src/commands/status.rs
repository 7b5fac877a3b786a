//! Status command implementation
//!
//! Reports disablement and run-lock state from the artifacts alone; never
//! acquires, refreshes, or reclaims anything.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]

use anyhow::Result;
use warden_core::{AgentConfig, Disabler, RunLock};

/// Show disablement and run-lock state.
///
/// # Errors
///
/// Returns an error if the disablement artifact exists but is unreadable.
pub fn run(config: &AgentConfig) -> Result<i32> {
    match Disabler::new(&config.disabled_lockfile).disabled_message()? {
        Some(message) => println!("administratively disabled: '{message}'"),
        None => println!("enabled"),
    }

    let lock = RunLock::new(&config.lockfile);
    match lock.holder_pid() {
        Some(pid) => println!(
            "run in progress: pid {pid} holds {}",
            lock.path().display()
        ),
        None => println!("no run in progress"),
    }

    Ok(0)
}

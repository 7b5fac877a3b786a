//! Disable command implementation

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]

use anyhow::Result;
use warden_core::{AgentConfig, Disabler};

/// Write the disablement artifact so no further runs start.
///
/// # Errors
///
/// Returns an error if the artifact cannot be written.
pub fn run(config: &AgentConfig, message: &str) -> Result<i32> {
    Disabler::new(&config.disabled_lockfile).disable(message)?;
    println!("✓ Agent disabled (reason: '{message}')");
    Ok(0)
}

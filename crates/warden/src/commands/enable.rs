//! Enable command implementation

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]

use anyhow::Result;
use warden_core::{AgentConfig, Disabler};

/// Remove the disablement artifact; a no-op when already enabled.
///
/// # Errors
///
/// Returns an error if the artifact exists but cannot be removed.
pub fn run(config: &AgentConfig) -> Result<i32> {
    Disabler::new(&config.disabled_lockfile).enable()?;
    println!("✓ Agent enabled");
    Ok(0)
}

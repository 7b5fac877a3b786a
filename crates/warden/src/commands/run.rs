//! Run command implementation
//!
//! Assembles the controller from configuration and performs one supervised
//! run. In isolated mode the work happens in a relaunch of this executable
//! under the hidden child role; only the child touches the run lock.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]

use anyhow::Result;
use warden_core::{
    exec, Agent, AgentConfig, ChildCommand, ExecutionStrategy, ProcessCoordinator,
};

use crate::client::CommandClient;

/// Run command options
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Effective configuration after CLI overrides
    pub config: AgentConfig,
}

/// Run the run command, returning the process exit code
///
/// # Errors
///
/// Returns an error if the child role cannot be spawned or a lock or
/// disablement artifact cannot be accessed.
pub fn run(options: &RunOptions) -> Result<i32> {
    let config = &options.config;
    let strategy = if config.isolate {
        ExecutionStrategy::Isolated(child_command(config)?)
    } else {
        ExecutionStrategy::InProcess
    };

    let coordinator = ProcessCoordinator::new();
    let agent = Agent::new(config, strategy, &coordinator);
    let outcome = agent.run(|| CommandClient::from_command(&config.apply_command))?;

    println!("{outcome}");
    Ok(exec::exit_code_for(&outcome))
}

fn child_command(config: &AgentConfig) -> Result<ChildCommand> {
    let mut args = vec![
        "child-run".to_string(),
        "--lockfile".to_string(),
        config.lockfile.display().to_string(),
        "--runtimeout".to_string(),
        config.runtimeout.to_string(),
        "--".to_string(),
    ];
    args.extend(config.apply_command.iter().cloned());
    Ok(ChildCommand::current_exe(args)?)
}

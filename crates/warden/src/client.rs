//! The external apply command as a run client
//!
//! The supervised work is an arbitrary configured command. Its own exit
//! code is the run result; termination by signal has no code to report and
//! is a run failure.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]

use std::process::Command;

use warden_core::{ConfigClient, Error};

/// Runs the configured apply command as the work of a supervised run
#[derive(Debug, Clone)]
pub struct CommandClient {
    program: String,
    args: Vec<String>,
}

impl CommandClient {
    /// Build a client from the configured command line.
    ///
    /// # Errors
    ///
    /// Returns an error if no command is configured.
    pub fn from_command(command: &[String]) -> warden_core::Result<Self> {
        let Some((program, args)) = command.split_first() else {
            return Err(Error::ClientInit {
                reason: "no apply command configured".to_string(),
            });
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ConfigClient for CommandClient {
    fn run(&mut self) -> warden_core::Result<i32> {
        tracing::info!(command = %self.program, "applying configuration");
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|e| Error::ClientRun {
                reason: format!("failed to launch '{}': {e}", self.program),
            })?;
        status.code().ok_or_else(|| Error::ClientRun {
            reason: format!("'{}' was terminated by a signal", self.program),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_empty_command_is_rejected() {
        assert!(matches!(
            CommandClient::from_command(&[]),
            Err(Error::ClientInit { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_is_reported() {
        let mut client =
            CommandClient::from_command(&["sh".to_string(), "-c".to_string(), "exit 4".to_string()])
                .unwrap();
        assert_eq!(client.run().unwrap(), 4);
    }

    #[test]
    fn test_unlaunchable_command_is_a_run_error() {
        let mut client =
            CommandClient::from_command(&["/definitely/not/a/real/binary".to_string()]).unwrap();
        assert!(matches!(client.run(), Err(Error::ClientRun { .. })));
    }
}

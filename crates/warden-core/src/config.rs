//! Agent configuration
//!
//! Loaded from a TOML file by the CLI and consumed by the run controller.
//! Durations are whole seconds; a `runtimeout` of zero disables timeout
//! enforcement entirely.
//!
//! # Example Config
//!
//! ```toml
//! lockfile = "/var/run/warden/agent.lock"
//! disabled_lockfile = "/var/run/warden/agent.disabled"
//! runtimeout = 3600
//! splay = true
//! splaylimit = 300
//! isolate = true
//! apply_command = ["/usr/local/bin/apply-catalog", "--verbose"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration consumed by the run controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Path of the run lock artifact
    pub lockfile: PathBuf,
    /// Path of the administrative disablement artifact
    pub disabled_lockfile: PathBuf,
    /// Seconds a lock holder may run before being reclaimed; 0 disables
    /// enforcement
    pub runtimeout: u64,
    /// Whether to apply a startup splay delay
    pub splay: bool,
    /// Upper bound of the splay delay, in seconds
    pub splaylimit: u64,
    /// Whether to isolate the run in a child process
    pub isolate: bool,
    /// Program and arguments the run executes (the configuration
    /// application client)
    pub apply_command: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            lockfile: PathBuf::from("warden.lock"),
            disabled_lockfile: PathBuf::from("warden.disabled"),
            runtimeout: 0,
            splay: false,
            splaylimit: 0,
            isolate: true,
            apply_command: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, cannot be parsed, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field preconditions.
    ///
    /// # Errors
    ///
    /// Returns an error when splay is enabled without a limit to draw the
    /// delay from.
    pub fn validate(&self) -> Result<()> {
        if self.splay && self.splaylimit == 0 {
            return Err(Error::InvalidConfig {
                reason: "splay is enabled but splaylimit is 0".to_string(),
            });
        }
        Ok(())
    }

    /// Timeout budget for a lock holder; zero disables enforcement
    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.runtimeout)
    }

    /// Effective splay limit; zero when splay is off
    #[must_use]
    pub fn splay_limit(&self) -> Duration {
        if self.splay {
            Duration::from_secs(self.splaylimit)
        } else {
            Duration::ZERO
        }
    }
}

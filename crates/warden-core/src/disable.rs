//! Administrative disablement
//!
//! A JSON artifact at a configured path marks the agent disabled; its
//! presence is the disabled state, and its message tells operators why.
//! Disablement is checked before any lock interaction, so a disabled agent
//! never creates or touches the run lock.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Contents of the disablement artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DisabledState {
    /// Operator-supplied reason
    disabled_message: String,
    /// When the agent was disabled
    disabled_at: DateTime<Utc>,
}

/// Manages the administrative disablement artifact
#[derive(Debug, Clone)]
pub struct Disabler {
    path: PathBuf,
}

impl Disabler {
    /// Create a handle for the disablement artifact at `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the disablement artifact
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mark the agent disabled with an explanatory message.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be written.
    pub fn disable(&self, message: &str) -> Result<()> {
        let state = DisabledState {
            disabled_message: message.to_string(),
            disabled_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&state).map_err(|e| Error::DisableFormat {
            path: self.path.clone(),
            source: e,
        })?;
        fs::write(&self.path, json).map_err(|e| Error::DisableFile {
            path: self.path.clone(),
            source: e,
        })?;
        tracing::info!(path = %self.path.display(), message, "agent administratively disabled");
        Ok(())
    }

    /// Re-enable the agent. Enabling an already-enabled agent is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact exists but cannot be removed.
    pub fn enable(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "agent re-enabled");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::DisableFile {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// The disable message when disabled, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact exists but cannot be read or holds
    /// malformed JSON.
    pub fn disabled_message(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::DisableFile {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        let state: DisabledState =
            serde_json::from_str(&content).map_err(|e| Error::DisableFormat {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(Some(state.disabled_message))
    }
}

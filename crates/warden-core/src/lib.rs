//! Warden-core - run orchestration for a node configuration agent
//!
//! This crate provides:
//! - File-based run lock with holder identity and acquisition time
//! - Runtimeout enforcement against stale lock holders
//! - In-process and isolated-child execution strategies
//! - The run controller that gates, isolates, and supervises one run

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod disable;
pub mod enforce;
pub mod error;
pub mod exec;
pub mod lock;
pub mod outcome;
pub mod splay;

pub use agent::{Agent, ConfigClient};
pub use config::AgentConfig;
pub use coordinator::{ProcessCoordinator, RunCoordinator, RunStatus};
pub use disable::Disabler;
pub use enforce::{Enforcement, TimeoutEnforcer};
pub use error::{Error, Result};
pub use exec::{ChildCommand, ChildVerdict, ExecutionStrategy, EXIT_OUT_OF_MEMORY, EXIT_UNCONTROLLED};
pub use lock::{Acquisition, LockGuard, RunLock};
pub use outcome::{RunOutcome, SkipReason};
pub use splay::Splayer;

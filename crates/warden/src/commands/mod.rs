//! Commands module for the warden CLI
//!
//! Provides command implementations for run, child-run, enable, disable,
//! and status operations.

pub mod child_run;
pub mod disable;
pub mod enable;
pub mod run;
pub mod status;

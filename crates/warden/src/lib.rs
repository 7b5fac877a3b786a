//! Warden - supervised runs for a node configuration agent
//!
//! One run at a time per node, administrative disablement, randomized
//! startup splay, and reclamation of locks held past their runtimeout.

pub mod cli;
pub mod client;
pub mod commands;

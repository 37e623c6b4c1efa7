//! cratesync - remote sync orchestrator library
//!
//! Exposes the console's components: confirmation gate, daemon lifecycle
//! manager, transfer mode registry and transfer dispatcher.

pub mod cli;
pub mod config;
pub mod confirm;
pub mod console;
pub mod constants;
pub mod daemon;
pub mod logging;
pub mod models;
pub mod output;
pub mod registry;
pub mod transfer;

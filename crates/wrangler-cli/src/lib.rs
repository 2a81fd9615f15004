//! Command-line host for the wrangler orchestrator.
//!
//! `main.rs` parses arguments and dispatches to [`handlers`]. Every handler
//! receives a [`CliContext`] built by [`bootstrap`] and talks only to the
//! `Orchestrator` facade.

pub mod bootstrap;
pub mod commands;
pub mod config_commands;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliContext, SettingsOverrides, bootstrap};
pub use commands::{Commands, DownloadCommand, ToolchainCommand};
pub use config_commands::ConfigCommand;
pub use parser::Cli;

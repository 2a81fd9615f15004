//! Command handlers.
//!
//! Each handler takes the [`CliContext`](crate::CliContext), calls the
//! orchestrator and formats the result for the terminal. No business logic
//! lives here.

pub mod check_deps;
pub mod config;
pub mod delete;
pub mod jobs;
pub mod models;
pub mod serve;
pub mod status;
pub mod toolchain;

use anyhow::Result;
use serde_json::Value;
use wrangler_core::ActionOutcome;

use crate::CliContext;

/// Print a successful action: the text, or `{"success":true}` in JSON mode.
pub fn print_success(ctx: &CliContext, text: &str) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string(&ActionOutcome::ok())?);
    } else {
        println!("{text}");
    }
    Ok(())
}

/// Print a serializable value as JSON.
pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let value: Value = serde_json::to_value(value)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

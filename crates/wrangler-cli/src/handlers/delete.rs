//! `wrangler delete`

use std::path::Path;

use anyhow::Result;

use super::print_success;
use crate::CliContext;

pub fn execute(ctx: &CliContext, model: &Path) -> Result<()> {
    ctx.orchestrator.delete_model(model)?;
    print_success(ctx, &format!("Deleted {}", model.display()))
}

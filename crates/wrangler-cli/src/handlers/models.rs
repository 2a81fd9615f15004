//! `wrangler models`

use anyhow::Result;

use super::print_json;
use crate::CliContext;
use crate::presentation::{print_separator, truncate_string};

pub fn execute(ctx: &CliContext) -> Result<()> {
    let models = ctx.orchestrator.list_models();
    if ctx.json {
        return print_json(&models);
    }

    if models.is_empty() {
        println!("No models found.");
        println!("Download one with: wrangler download hf <repo>");
        return Ok(());
    }

    println!("{:<48} {:<10} {:>10}  {}", "NAME", "QUANT", "SIZE", "LOCATION");
    print_separator(84);
    for model in &models {
        println!(
            "{:<48} {:<10} {:>10}  {}",
            truncate_string(&model.filename, 48),
            model.quant_tag,
            model.display_size(),
            model.source_location
        );
    }
    println!();
    println!("{} model(s)", models.len());
    Ok(())
}

//! `wrangler config`

use anyhow::{Result, bail};
use wrangler_core::SettingsUpdate;

use super::{print_json, print_success};
use crate::CliContext;
use crate::config_commands::ConfigCommand;

pub async fn execute(ctx: &CliContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::SetToolchain { path } => {
            let settings = ctx.orchestrator.set_toolchain_root(&path).await?;
            print_success(
                ctx,
                &format!("Toolchain root set to {}", settings.toolchain_root.display()),
            )
        }
        ConfigCommand::Set {
            server_port,
            quant_level,
            delete_original,
            models_dir,
            scripts_dir,
            alt_root,
            context_size,
        } => {
            let update = SettingsUpdate {
                server_port,
                toolchain_root: None,
                alt_root,
                models_dir,
                default_quant_level: quant_level,
                delete_original_after_quantize: delete_original,
                scripts_dir,
                context_size,
            };
            if update.is_empty() {
                bail!("No settings given. See `wrangler config set --help`.");
            }
            ctx.orchestrator.update_settings(&update).await?;
            print_success(ctx, "Settings updated")
        }
    }
}

fn show(ctx: &CliContext) -> Result<()> {
    let settings = ctx.orchestrator.settings();
    if ctx.json {
        return print_json(&settings);
    }

    println!("server port                  {}", settings.server_port);
    println!("toolchain root               {}", settings.toolchain_root.display());
    println!("alternate root               {}", settings.alt_root.display());
    println!("models directory             {}", settings.models_dir.display());
    println!("scripts directory            {}", settings.scripts_dir.display());
    println!("default quant level          {}", settings.default_quant_level);
    println!("delete original on quantize  {}", settings.delete_original_after_quantize);
    println!("context size                 {}", settings.context_size);
    Ok(())
}

//! `wrangler check-deps`

use anyhow::Result;

use super::print_json;
use crate::CliContext;

pub fn execute(ctx: &CliContext) -> Result<()> {
    let report = ctx.orchestrator.check_dependencies();
    if ctx.json {
        return print_json(&report);
    }

    match &report.toolchain_root {
        Some(root) => println!("✓ llama.cpp      {}", root.display()),
        None => {
            println!("✗ llama.cpp      not found");
            for root in &report.searched {
                println!("    searched {}", root.display());
            }
            println!("    install with: wrangler toolchain install");
        }
    }
    match &report.python {
        Some(python) => println!("✓ python3        {}", python.display()),
        None => println!("✗ python3        not on PATH (needed for downloads)"),
    }
    if report.cuda_toolkit {
        println!("✓ CUDA toolkit   GPU offload enabled");
    } else {
        println!("- CUDA toolkit   not found");
    }
    Ok(())
}

//! Root argument parser with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Run llama.cpp servers, download and quantize models.
#[derive(Parser)]
#[command(name = "wrangler")]
#[command(about = "Orchestrate a local llama.cpp inference server")]
#[command(version)]
pub struct Cli {
    /// Server port for this invocation (not persisted)
    #[arg(long, global = true, env = "WRANGLER_PORT")]
    pub port: Option<u16>,

    /// llama.cpp checkout to use for this invocation (not persisted)
    #[arg(long, global = true, env = "WRANGLER_TOOLCHAIN")]
    pub toolchain: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

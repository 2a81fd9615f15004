//! Settings subcommands.

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show all current settings
    Show,

    /// Point at an existing llama.cpp checkout with a built server
    SetToolchain {
        path: PathBuf,
    },

    /// Update settings
    Set {
        /// Server port (>= 1024)
        #[arg(long)]
        server_port: Option<u16>,
        /// Default quantization level
        #[arg(long)]
        quant_level: Option<String>,
        /// Delete the original model after a successful quantization
        #[arg(long)]
        delete_original: Option<bool>,
        /// Directory downloads are written to
        #[arg(long)]
        models_dir: Option<PathBuf>,
        /// Directory holding the download helper scripts
        #[arg(long)]
        scripts_dir: Option<PathBuf>,
        /// Alternate (Metal) install root
        #[arg(long)]
        alt_root: Option<PathBuf>,
        /// Server context size (512-1000000)
        #[arg(long)]
        context_size: Option<u32>,
    },
}

//! Top-level subcommands.

use std::path::PathBuf;

use clap::Subcommand;

use crate::config_commands::ConfigCommand;

#[derive(Subcommand)]
pub enum Commands {
    /// List model files across the configured directories
    Models,

    /// Show which model is being served on the configured port
    Status,

    /// Start the server on a model and follow its log until Ctrl-C
    Serve {
        /// Path to a .gguf model file
        model: PathBuf,
    },

    /// Download a model through a helper script
    Download {
        #[command(subcommand)]
        source: DownloadCommand,
    },

    /// Re-encode a model at another quantization level
    Quantize {
        /// Path to the source .gguf model
        model: PathBuf,
        /// Target level (defaults to the configured level, e.g. Q4_K_M)
        #[arg(short, long)]
        level: Option<String>,
    },

    /// Delete a model file
    Delete {
        /// Path to the .gguf model
        model: PathBuf,
    },

    /// Check for llama.cpp, python3 and CUDA
    CheckDeps,

    /// View or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Manage the llama.cpp toolchain
    Toolchain {
        #[command(subcommand)]
        command: ToolchainCommand,
    },
}

#[derive(Subcommand)]
pub enum DownloadCommand {
    /// From a HuggingFace repository URL or id
    Hf {
        /// e.g. https://huggingface.co/TheBloke/Mistral-7B-GGUF
        url: String,
    },
    /// From the Ollama registry
    Ollama {
        /// e.g. llama3:8b
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ToolchainCommand {
    /// Clone and build llama.cpp into the configured toolchain root
    Install,
}

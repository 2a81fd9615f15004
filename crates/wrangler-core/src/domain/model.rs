//! Model file snapshots and filename conventions.
//!
//! Model artifacts follow the `<base>-<QUANT>.gguf` naming convention used by
//! llama.cpp tooling. Quant tags are recovered from filenames only; the file
//! contents are never parsed here.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// File extension of model artifacts (without the dot).
pub const MODEL_EXTENSION: &str = "gguf";

/// Substring identifying vocabulary-only artifacts, which are not loadable models.
pub const VOCAB_ONLY_MARKER: &str = "ggml-vocab";

/// Quant tag reported when the filename carries none.
pub const UNKNOWN_QUANT_TAG: &str = "GGUF";

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

static QUANT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[QF]\d+_[A-Z0-9_]+").expect("quant tag pattern is valid"));

static TRAILING_QUANT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-[QF]\d+_[A-Z0-9_]+$").expect("quant suffix pattern is valid")
});

/// Directory a model was discovered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelLocation {
    /// The wrangler-managed models directory.
    Wrangler,
    /// The external toolchain's model directory.
    Toolchain,
    /// The alternate (platform-specific) install's model directory.
    AltInstall,
}

impl ModelLocation {
    /// Human-readable label for listings.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Wrangler => "Wrangler",
            Self::Toolchain => "llama.cpp",
            Self::AltInstall => "MetalLlama",
        }
    }
}

impl std::fmt::Display for ModelLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Immutable snapshot of a model file produced by a scan.
///
/// Identity is the absolute path. Snapshots are never mutated; a rescan
/// produces fresh values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFile {
    /// Resolved absolute path of the file.
    pub absolute_path: PathBuf,
    /// File name including extension.
    pub filename: String,
    /// Size on disk in bytes.
    pub size_bytes: u64,
    /// Quant tag parsed from the filename, or [`UNKNOWN_QUANT_TAG`].
    pub quant_tag: String,
    /// Directory class the file was found in.
    pub source_location: ModelLocation,
}

impl ModelFile {
    /// Build a snapshot from a resolved path and its size.
    pub fn new(absolute_path: PathBuf, size_bytes: u64, source_location: ModelLocation) -> Self {
        let filename = absolute_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let quant_tag = quant_tag_from_filename(&filename)
            .unwrap_or(UNKNOWN_QUANT_TAG)
            .to_string();

        Self {
            absolute_path,
            filename,
            size_bytes,
            quant_tag,
            source_location,
        }
    }

    /// Size in GiB.
    #[allow(clippy::cast_precision_loss)]
    pub fn size_gib(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_GIB
    }

    /// Size formatted for listings, e.g. `4.07 GB`.
    pub fn display_size(&self) -> String {
        format!("{:.2} GB", self.size_gib())
    }
}

/// Whether a file name denotes a loadable model artifact.
pub fn is_model_artifact(filename: &str) -> bool {
    filename.ends_with(&format!(".{MODEL_EXTENSION}")) && !filename.contains(VOCAB_ONLY_MARKER)
}

/// Extract the first quant tag (e.g. `Q4_K_M`) from a file name.
pub fn quant_tag_from_filename(filename: &str) -> Option<&str> {
    QUANT_TAG.find(filename).map(|m| m.as_str())
}

/// Remove a trailing `-<QUANT>` suffix from a model base name.
///
/// Only the final suffix is stripped, so `llama-Q8_0-Q4_K_M` becomes
/// `llama-Q8_0`.
pub fn strip_quant_suffix(base_name: &str) -> &str {
    match TRAILING_QUANT_SUFFIX.find(base_name) {
        Some(m) => &base_name[..m.start()],
        None => base_name,
    }
}

/// Compute the output path for re-encoding `input` at `quant_level`.
///
/// The output lands next to the input as `<clean-base>-<LEVEL>.gguf`.
pub fn quantized_output_path(input: &Path, quant_level: &str) -> PathBuf {
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = filename
        .strip_suffix(&format!(".{MODEL_EXTENSION}"))
        .unwrap_or(&filename);
    let clean = strip_quant_suffix(base);
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{clean}-{quant_level}.{MODEL_EXTENSION}"))
}

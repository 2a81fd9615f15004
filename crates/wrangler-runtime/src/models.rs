//! Model registry scan over the configured model directories.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use wrangler_core::{ModelFile, ModelLocation, OrchestratorError, Settings, is_model_artifact};

/// Directories scanned for models, in priority order.
pub fn scan_roots(settings: &Settings) -> Vec<(PathBuf, ModelLocation)> {
    vec![
        (settings.models_dir.clone(), ModelLocation::Wrangler),
        (settings.toolchain_root.join("models"), ModelLocation::Toolchain),
        (settings.alt_root.join("models"), ModelLocation::AltInstall),
        // Models dropped straight into the checkout.
        (settings.toolchain_root.clone(), ModelLocation::Toolchain),
    ]
}

/// List model files across `roots`.
///
/// Missing or unreadable directories and files are skipped. A file reachable
/// from several roots is reported once, attributed to the first root. The
/// result is sorted by file name.
pub fn scan(roots: &[(PathBuf, ModelLocation)]) -> Vec<ModelFile> {
    let mut seen = HashSet::new();
    let mut models = Vec::new();

    for (dir, location) in roots {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "skipping model directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            if !is_model_artifact(&name.to_string_lossy()) {
                continue;
            }
            match snapshot(&entry.path(), *location) {
                Ok(model) => {
                    if seen.insert(model.absolute_path.clone()) {
                        models.push(model);
                    }
                }
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "skipping model file");
                }
            }
        }
    }

    models.sort_by(|a, b| a.filename.cmp(&b.filename));
    models
}

fn snapshot(path: &Path, location: ModelLocation) -> io::Result<ModelFile> {
    let resolved = path.canonicalize()?;
    let metadata = fs::metadata(&resolved)?;
    if !metadata.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
    }
    Ok(ModelFile::new(resolved, metadata.len(), location))
}

/// Remove a model file from disk.
pub fn delete_model(path: &Path) -> Result<(), OrchestratorError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(OrchestratorError::ModelNotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

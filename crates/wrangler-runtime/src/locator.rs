//! Toolchain binary resolution.
//!
//! Every candidate is re-checked on each call. The toolchain can be rebuilt or
//! replaced between calls, so nothing is cached.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use wrangler_core::{ConfigurationError, ToolRole};

/// No candidate location holds the binary.
#[derive(Debug, Error)]
#[error("{role} not found in any of {} candidate locations", .searched.len())]
pub struct LocateError {
    pub role: ToolRole,
    pub searched: Vec<PathBuf>,
}

impl From<LocateError> for ConfigurationError {
    fn from(err: LocateError) -> Self {
        Self::BinaryNotFound {
            role: err.role,
            searched: err.searched,
        }
    }
}

/// All candidate paths for `role` under `roots`, in search order.
///
/// Roots are visited in the order given; within a root, the role's
/// sub-paths are visited in priority order.
pub fn candidates<P: AsRef<Path>>(role: ToolRole, roots: &[P]) -> Vec<PathBuf> {
    let subpaths = role.candidate_subpaths();
    roots
        .iter()
        .flat_map(|root| subpaths.iter().map(move |sub| root.as_ref().join(sub)))
        .collect()
}

/// Return the first existing candidate for `role`.
pub fn locate<P: AsRef<Path>>(role: ToolRole, roots: &[P]) -> Result<PathBuf, LocateError> {
    let searched = candidates(role, roots);
    if let Some(found) = searched.iter().find(|path| path.is_file()) {
        debug!(role = %role, path = %found.display(), "located toolchain binary");
        return Ok(found.clone());
    }

    debug!(role = %role, candidates = searched.len(), "toolchain binary not found");
    Err(LocateError { role, searched })
}

/// Whether `root` holds a built server binary.
pub fn is_built_toolchain(root: &Path) -> bool {
    locate(ToolRole::Server, &[root]).is_ok()
}

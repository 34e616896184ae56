//! Build dependency checks.
//!
//! Dependency resolution proper belongs to a full package manager; here we
//! only verify that each declared build-time dependency resolves to an
//! executable on PATH before the build starts. Runtime dependencies are
//! recorded in the install receipt but not resolved.

use crate::error::{MaltError, Result};
use crate::manifest::Manifest;
use std::path::{Path, PathBuf};

/// Locate an executable by name on PATH
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

/// Verify every `depends_on ... => :build` name is available
pub fn verify_build_dependencies(manifest: &Manifest) -> Result<()> {
    for dep in manifest.dependencies.iter().filter(|d| d.build) {
        match find_executable(&dep.name) {
            Some(path) => tracing::debug!(dep = %dep.name, path = %path.display(), "found build dependency"),
            None => return Err(MaltError::DependencyMissing(dep.name.clone())),
        }
    }
    Ok(())
}

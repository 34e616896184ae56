//! Source archive extraction.
//!
//! Source tarballs are gzip-compressed tar archives. GitHub release
//! archives wrap everything in a single `{name}-{version}/` directory;
//! after unpacking, that directory becomes the build root.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Path, PathBuf};
use tar::Archive;

/// Extract a source tarball into `dest` and return the build root.
///
/// If the archive contains exactly one top-level directory (the GitHub
/// archive layout), that directory is returned; otherwise `dest` itself is.
pub fn extract_source(archive_path: &Path, dest: &Path) -> Result<PathBuf> {
    if dest.exists() {
        fs::remove_dir_all(dest)
            .with_context(|| format!("Failed to clear build directory: {}", dest.display()))?;
    }
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create build directory: {}", dest.display()))?;

    let file = fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let decompressor = GzDecoder::new(file);
    let mut archive = Archive::new(decompressor);

    archive
        .unpack(dest)
        .with_context(|| format!("Failed to extract archive to: {}", dest.display()))?;

    // Descend into a single top-level directory if that's all there is
    let mut entries = fs::read_dir(dest)
        .with_context(|| format!("Failed to read build directory: {}", dest.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect::<Vec<_>>();

    if entries.len() == 1 && entries[0].is_dir() {
        return Ok(entries.remove(0));
    }

    Ok(dest.to_path_buf())
}

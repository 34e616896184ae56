//! Symlink management for installed kegs

use crate::cellar;
use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};

/// Link a keg's `bin` into the prefix `bin` with relative symlinks.
///
/// Existing links that already point at this keg are left alone; links
/// pointing elsewhere are skipped rather than clobbered.
pub fn link_keg(prefix: &Path, name: &str, version: &str) -> Result<Vec<PathBuf>> {
    let keg_bin = cellar::keg_path(prefix, name, version).join("bin");
    let target_dir = prefix.join("bin");

    let mut linked = Vec::new();

    if !keg_bin.is_dir() {
        return Ok(linked);
    }

    fs::create_dir_all(&target_dir)
        .with_context(|| format!("Failed to create directory: {}", target_dir.display()))?;

    for entry in fs::read_dir(&keg_bin)? {
        let entry = entry?;
        let source = entry.path();
        let target = target_dir.join(entry.file_name());

        if source.is_dir() {
            continue;
        }

        if create_relative_symlink(prefix, &source, &target)? {
            linked.push(target);
        }
    }

    Ok(linked)
}

/// Compute the relative link body for a keg file as seen from `prefix/bin`
fn relative_link_body(prefix: &Path, source: &Path) -> PathBuf {
    match source.strip_prefix(prefix) {
        // prefix/bin/x -> ../Cellar/name/version/bin/x
        Ok(rel) => PathBuf::from("..").join(rel),
        Err(_) => source.to_path_buf(),
    }
}

fn create_relative_symlink(prefix: &Path, source: &Path, target: &Path) -> Result<bool> {
    let body = relative_link_body(prefix, source);

    if target.symlink_metadata().is_ok() {
        if let Ok(existing) = fs::read_link(target) {
            if existing == body {
                // Already linked correctly
                return Ok(true);
            }
        }
        // Target exists but is not ours - skip for safety
        return Ok(false);
    }

    unix_fs::symlink(&body, target).with_context(|| {
        format!(
            "Failed to create symlink: {} -> {}",
            target.display(),
            body.display()
        )
    })?;

    Ok(true)
}

/// Remove prefix `bin` symlinks that point into this keg
pub fn unlink_keg(prefix: &Path, name: &str, version: &str) -> Result<Vec<PathBuf>> {
    let keg_path = cellar::keg_path(prefix, name, version);
    let target_dir = prefix.join("bin");

    let mut unlinked = Vec::new();

    if !target_dir.is_dir() {
        return Ok(unlinked);
    }

    for entry in fs::read_dir(&target_dir)? {
        let entry = entry?;
        let target = entry.path();

        if target.symlink_metadata()?.file_type().is_symlink() {
            if let Ok(link_body) = fs::read_link(&target) {
                let resolved = if link_body.is_relative() {
                    target.parent().unwrap().join(&link_body)
                } else {
                    link_body.clone()
                };
                let resolved = normalize_path(&resolved);

                if resolved.starts_with(&keg_path) {
                    fs::remove_file(&target)?;
                    unlinked.push(target);
                }
            }
        }
    }

    Ok(unlinked)
}

/// Resolve `.` and `..` components without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

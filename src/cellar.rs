//! Cellar management - keg layout and installed packages

use crate::error::{MaltError, Result};
use crate::receipt::InstallReceipt;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolve the install prefix: `MALT_PREFIX` env var, else `~/.maltster`
pub fn detect_prefix() -> PathBuf {
    if let Ok(prefix) = std::env::var("MALT_PREFIX") {
        return PathBuf::from(prefix);
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".maltster");
    }

    PathBuf::from(".maltster")
}

/// The Cellar directory under a prefix
pub fn cellar_path(prefix: &Path) -> PathBuf {
    prefix.join("Cellar")
}

/// The keg directory for one installed version
pub fn keg_path(prefix: &Path, name: &str, version: &str) -> PathBuf {
    cellar_path(prefix).join(name).join(version)
}

/// An installed keg in the Cellar
#[derive(Debug, Clone)]
pub struct InstalledKeg {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
    pub receipt: Option<InstallReceipt>,
}

impl InstalledKeg {
    /// Create from a Cellar version directory
    pub fn from_path(name: String, version: String, path: PathBuf) -> Self {
        let receipt = InstallReceipt::read(&path).ok();
        Self {
            name,
            version,
            path,
            receipt,
        }
    }

    /// Total size of the keg's files in bytes
    pub fn size_bytes(&self) -> u64 {
        walkdir::WalkDir::new(&self.path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.metadata().ok())
            .filter(|metadata| metadata.is_file())
            .map(|metadata| metadata.len())
            .sum()
    }
}

/// Read all installed kegs from the Cellar
pub fn list_installed(prefix: &Path) -> Result<Vec<InstalledKeg>> {
    let cellar = cellar_path(prefix);

    if !cellar.exists() {
        return Ok(vec![]);
    }

    let mut kegs = Vec::new();

    for entry in fs::read_dir(&cellar)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();

        // Skip hidden files
        if name.starts_with('.') || !entry.path().is_dir() {
            continue;
        }

        for version_entry in fs::read_dir(entry.path())? {
            let version_entry = version_entry?;
            let version = version_entry.file_name().to_string_lossy().to_string();

            if version.starts_with('.') {
                continue;
            }

            kegs.push(InstalledKeg::from_path(
                name.clone(),
                version,
                version_entry.path(),
            ));
        }
    }

    kegs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(kegs)
}

/// Get all installed versions of a package, newest first
pub fn installed_versions(prefix: &Path, name: &str) -> Result<Vec<InstalledKeg>> {
    let package_path = cellar_path(prefix).join(name);

    if !package_path.exists() {
        return Ok(vec![]);
    }

    let mut kegs = Vec::new();

    for entry in fs::read_dir(&package_path)? {
        let entry = entry?;
        let version = entry.file_name().to_string_lossy().to_string();

        if version.starts_with('.') {
            continue;
        }

        kegs.push(InstalledKeg::from_path(
            name.to_string(),
            version,
            entry.path(),
        ));
    }

    kegs.sort_by(|a, b| compare_versions(&a.version, &b.version));
    kegs.reverse();

    Ok(kegs)
}

/// Copy built `bin` artifacts into the keg and mark them executable
pub fn install_artifacts(
    build_dir: &Path,
    artifacts: &[String],
    keg: &Path,
) -> Result<Vec<PathBuf>> {
    use std::os::unix::fs::PermissionsExt;

    let keg_bin = keg.join("bin");
    fs::create_dir_all(&keg_bin)
        .map_err(|e| MaltError::Install(format!("cannot create {}: {}", keg_bin.display(), e)))?;

    let mut installed = Vec::new();

    for artifact in artifacts {
        let source = build_dir.join(artifact);
        if !source.is_file() {
            return Err(MaltError::Install(format!(
                "built artifact missing: {}",
                source.display()
            )));
        }

        let file_name = source
            .file_name()
            .ok_or_else(|| MaltError::Install(format!("invalid artifact name: {}", artifact)))?;
        let dest = keg_bin.join(file_name);

        fs::copy(&source, &dest).map_err(|e| {
            MaltError::Install(format!("cannot install {}: {}", dest.display(), e))
        })?;
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o755)).map_err(|e| {
            MaltError::Install(format!("cannot chmod {}: {}", dest.display(), e))
        })?;

        installed.push(dest);
    }

    Ok(installed)
}

/// Remove a keg; clears the package directory too when it becomes empty
pub fn remove_keg(prefix: &Path, name: &str, version: &str) -> Result<()> {
    let keg = keg_path(prefix, name, version);

    if !keg.exists() {
        return Err(MaltError::Install(format!(
            "{} {} is not installed",
            name, version
        )));
    }

    fs::remove_dir_all(&keg)?;

    let package_dir = cellar_path(prefix).join(name);
    if package_dir.exists() && fs::read_dir(&package_dir)?.next().is_none() {
        fs::remove_dir(&package_dir)?;
    }

    Ok(())
}

/// Compare two version strings semantically
fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let a_parts: Vec<u32> = a.split('.').filter_map(|s| s.parse::<u32>().ok()).collect();
    let b_parts: Vec<u32> = b.split('.').filter_map(|s| s.parse::<u32>().ok()).collect();

    for i in 0..a_parts.len().max(b_parts.len()) {
        let a_part = a_parts.get(i).unwrap_or(&0);
        let b_part = b_parts.get(i).unwrap_or(&0);
        match a_part.cmp(b_part) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }

    a.cmp(b)
}

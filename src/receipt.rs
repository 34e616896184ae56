//! Install receipt generation and metadata.
//!
//! Each installed keg carries an `INSTALL_RECEIPT.json` recording how and
//! when it was produced: the interpreter version, the source archive and
//! its digest, the dependency list, and timestamps. Receipts let `list`
//! and `uninstall` report on installations without re-reading manifests.

use crate::manifest::Manifest;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Install receipt stored alongside each keg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub interpreter_version: String,
    pub version: String,
    pub built_from_source: bool,
    #[serde(default)]
    pub installed_on_request: bool,
    pub time: i64,
    pub time_iso8601: String,
    pub source: SourceInfo,
    #[serde(default)]
    pub build_dependencies: Vec<String>,
    #[serde(default)]
    pub runtime_dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub url: String,
    pub sha256: String,
}

impl InstallReceipt {
    /// Read an existing INSTALL_RECEIPT.json file
    pub fn read(keg_path: &Path) -> Result<Self> {
        let receipt_path = keg_path.join("INSTALL_RECEIPT.json");
        let contents = fs::read_to_string(&receipt_path)
            .with_context(|| format!("Failed to read receipt: {}", receipt_path.display()))?;

        let receipt: Self =
            serde_json::from_str(&contents).context("Failed to parse INSTALL_RECEIPT.json")?;

        Ok(receipt)
    }

    /// Create a receipt for a from-source installation
    pub fn new_build(manifest: &Manifest, version: &str, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            interpreter_version: format!("maltster/{}", env!("CARGO_PKG_VERSION")),
            version: version.to_string(),
            built_from_source: true,
            installed_on_request: true,
            time: timestamp.timestamp(),
            time_iso8601: timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            source: SourceInfo {
                url: manifest.url.clone(),
                sha256: manifest.sha256.clone(),
            },
            build_dependencies: manifest
                .dependencies
                .iter()
                .filter(|d| d.build)
                .map(|d| d.name.clone())
                .collect(),
            runtime_dependencies: manifest
                .dependencies
                .iter()
                .filter(|d| !d.build)
                .map(|d| d.name.clone())
                .collect(),
            license: manifest.license.clone(),
        }
    }

    /// Write receipt to INSTALL_RECEIPT.json
    pub fn write(&self, keg_path: &Path) -> Result<()> {
        let receipt_path = keg_path.join("INSTALL_RECEIPT.json");
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize install receipt")?;

        fs::write(&receipt_path, json)
            .with_context(|| format!("Failed to write receipt: {}", receipt_path.display()))?;

        Ok(())
    }
}

//! The install pipeline - one manifest through parse, fetch, build,
//! install, link, and test.
//!
//! [`Pipeline`] owns the shared HTTP client and the prefix/cache roots, and
//! runs the strictly sequential stage order:
//!
//! ```text
//! conflicts -> deps -> fetch -> extract -> build -> install -> link -> receipt
//! ```
//!
//! Every stage is fail-fast: the first error aborts the rest of the run and
//! surfaces verbatim. There are no retries and no partial-success states;
//! the only deliberate exception is the smoke test, which never rolls back
//! an installation it fails.
//!
//! # Examples
//!
//! ```no_run
//! use maltster::{Manifest, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manifest = Manifest::from_path(std::path::Path::new("widget.formula"))?;
//!     let pipeline = Pipeline::new()?;
//!
//!     let result = pipeline.install(&manifest, Default::default()).await?;
//!     println!("Installed {} {} in {} ms", result.name, result.version, result.time_ms);
//!
//!     let report = pipeline.test(&manifest).await?;
//!     println!("Test passed: {}", report.command);
//!     Ok(())
//! }
//! ```

use crate::cellar;
use crate::check::{self, TestReport};
use crate::deps;
use crate::error::{MaltError, Result};
use crate::extract;
use crate::fetch;
use crate::manifest::Manifest;
use crate::receipt::InstallReceipt;
use crate::symlink;
use indicatif::MultiProgress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Result of an install operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallResult {
    /// Package name
    pub name: String,
    /// Installed version
    pub version: String,
    /// Path in Cellar
    pub path: PathBuf,
    /// Whether symlinks were created
    pub linked: bool,
    /// Time taken (milliseconds)
    pub time_ms: u64,
}

/// Result of an uninstall operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallResult {
    /// Package name
    pub name: String,
    /// Uninstalled version
    pub version: String,
    /// Whether symlinks were removed
    pub unlinked: bool,
    /// Time taken (milliseconds)
    pub time_ms: u64,
}

/// Install behavior switches
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallOptions {
    /// Leave the keg unlinked
    pub skip_link: bool,
    /// Keep the build directory around for inspection
    pub keep_build: bool,
}

/// Manifest pipeline with shared HTTP client and filesystem roots
pub struct Pipeline {
    client: reqwest::Client,
    prefix: PathBuf,
    cache: PathBuf,
}

impl Pipeline {
    /// Create a pipeline rooted at the detected prefix and default cache
    pub fn new() -> Result<Self> {
        Self::with_roots(cellar::detect_prefix(), fetch::cache_dir())
    }

    /// Create a pipeline with explicit prefix and cache roots
    pub fn with_roots(prefix: PathBuf, cache: PathBuf) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(format!("malt/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            prefix,
            cache,
        })
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Download and verify the source archive
    pub async fn fetch_source(&self, manifest: &Manifest) -> Result<PathBuf> {
        let mp = MultiProgress::new();
        fetch::fetch(
            &self.client,
            &manifest.name,
            &manifest.url,
            &manifest.sha256,
            &self.cache,
            Some(&mp),
        )
        .await
    }

    /// Download and verify the source archive plus every declared resource
    pub async fn fetch_all(&self, manifest: &Manifest) -> Result<Vec<(String, PathBuf)>> {
        let source = self.fetch_source(manifest).await?;
        let mut fetched = vec![(manifest.name.clone(), source)];
        fetched.extend(fetch::fetch_resources(&self.client, &manifest.resources, &self.cache).await?);
        Ok(fetched)
    }

    /// Run the full install pipeline for one manifest
    pub async fn install(
        &self,
        manifest: &Manifest,
        options: InstallOptions,
    ) -> Result<InstallResult> {
        let started = Instant::now();

        self.check_conflicts(manifest)?;
        deps::verify_build_dependencies(manifest)?;

        let archive = self.fetch_source(manifest).await?;

        let version = manifest
            .effective_version()
            .ok_or_else(|| MaltError::Parse(format!("{} has no version", manifest.name)))?;
        let build_dir = self
            .cache
            .join("build")
            .join(format!("{}-{}", manifest.name, version));
        let build_root = extract::extract_source(&archive, &build_dir)?;

        let result = self.install_from_source(manifest, &build_root, options, started);

        if !options.keep_build && build_dir.exists() {
            let _ = std::fs::remove_dir_all(&build_dir);
        }

        result
    }

    /// Post-fetch stages: build in `build_root`, then install, receipt, link.
    ///
    /// Split out so a pre-staged source tree can be installed without
    /// touching the network.
    pub fn install_from_source(
        &self,
        manifest: &Manifest,
        build_root: &Path,
        options: InstallOptions,
        started: Instant,
    ) -> Result<InstallResult> {
        let version = manifest
            .effective_version()
            .ok_or_else(|| MaltError::Parse(format!("{} has no version", manifest.name)))?;
        let keg = cellar::keg_path(&self.prefix, &manifest.name, &version);

        // The build may write straight into {bin}
        std::fs::create_dir_all(keg.join("bin"))
            .map_err(|e| MaltError::Install(format!("cannot create {}: {}", keg.display(), e)))?;

        let timestamp = chrono::Utc::now();
        let mut vars = BTreeMap::new();
        vars.insert("version".to_string(), version.clone());
        vars.insert(
            "timestamp".to_string(),
            timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        );
        vars.insert("prefix".to_string(), self.prefix.display().to_string());
        vars.insert("cellar".to_string(), keg.display().to_string());
        vars.insert("bin".to_string(), keg.join("bin").display().to_string());

        crate::build::run_build(&manifest.install.build, build_root, &vars)?;

        cellar::install_artifacts(build_root, &manifest.install.bin, &keg)?;

        InstallReceipt::new_build(manifest, &version, timestamp).write(&keg)?;

        let linked = if options.skip_link {
            false
        } else {
            !symlink::link_keg(&self.prefix, &manifest.name, &version)?.is_empty()
        };

        tracing::info!(name = %manifest.name, %version, keg = %keg.display(), "installed");

        Ok(InstallResult {
            name: manifest.name.clone(),
            version,
            path: keg,
            linked,
            time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Stage test resources and run the manifest's smoke test
    pub async fn test(&self, manifest: &Manifest) -> Result<TestReport> {
        let staging = self.cache.join("staging").join(&manifest.name);
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        check::stage_resources(&self.client, manifest, &self.cache, &staging).await?;
        check::run_test(manifest, &self.prefix, &staging)
    }

    /// Uninstall every installed version of a package
    pub fn uninstall(&self, name: &str) -> Result<Vec<UninstallResult>> {
        let kegs = cellar::installed_versions(&self.prefix, name)?;
        if kegs.is_empty() {
            return Err(MaltError::Install(format!("{} is not installed", name)));
        }

        let mut results = Vec::new();
        for keg in kegs {
            let started = Instant::now();
            let unlinked = !symlink::unlink_keg(&self.prefix, name, &keg.version)?.is_empty();
            cellar::remove_keg(&self.prefix, name, &keg.version)?;

            results.push(UninstallResult {
                name: name.to_string(),
                version: keg.version,
                unlinked,
                time_ms: started.elapsed().as_millis() as u64,
            });
        }

        Ok(results)
    }

    /// Fail when a declared conflicting package is already installed
    fn check_conflicts(&self, manifest: &Manifest) -> Result<()> {
        for conflict in &manifest.conflicts {
            if !cellar::installed_versions(&self.prefix, &conflict.name)?.is_empty() {
                return Err(MaltError::Conflict {
                    name: manifest.name.clone(),
                    other: conflict.name.clone(),
                    because: conflict.because.clone(),
                });
            }
        }
        Ok(())
    }
}

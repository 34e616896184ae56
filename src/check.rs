//! Smoke-test execution: stage fixtures, run the declared command, assert
//! the expected substring appears in captured stdout.
//!
//! Mirrors the formula `test do` contract: the command must exit zero and
//! its output must contain the declared literal. A failed test never rolls
//! back the installation it checks.

use crate::build::{run_command, split_command, substitute};
use crate::error::{MaltError, Result};
use crate::fetch;
use crate::manifest::Manifest;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Outcome of a passing smoke test
#[derive(Debug, Clone)]
pub struct TestReport {
    /// The fully substituted command that ran
    pub command: String,
    /// Captured stdout
    pub output: String,
}

/// Stage the test's declared resources into `staging_dir`.
///
/// Each resource is fetched through the verified download cache, then
/// copied into the staging directory under its URL basename.
pub async fn stage_resources(
    client: &reqwest::Client,
    manifest: &Manifest,
    cache_dir: &Path,
    staging_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let Some(test) = &manifest.test else {
        return Ok(vec![]);
    };

    tokio::fs::create_dir_all(staging_dir).await?;

    let mut staged = Vec::new();

    for name in &test.stage {
        // Validated at parse time, but manifests can be built in code too
        let resource = manifest
            .resource(name)
            .ok_or_else(|| MaltError::Parse(format!("test stages unknown resource `{}`", name)))?;

        let cached = fetch::fetch(
            client,
            &resource.name,
            &resource.url,
            &resource.sha256,
            cache_dir,
            None,
        )
        .await?;

        let file_name = cached
            .file_name()
            .ok_or_else(|| MaltError::Install(format!("bad resource path: {}", cached.display())))?;
        let dest = staging_dir.join(file_name);
        tokio::fs::copy(&cached, &dest).await?;
        staged.push(dest);
    }

    Ok(staged)
}

/// Run the manifest's smoke test against an installed prefix.
///
/// Fails with [`MaltError::TestFailed`] on a non-zero exit and with
/// [`MaltError::TestAssertionFailed`] when the expected substring is absent
/// from stdout.
pub fn run_test(manifest: &Manifest, prefix: &Path, staging_dir: &Path) -> Result<TestReport> {
    let test = manifest
        .test
        .as_ref()
        .ok_or_else(|| MaltError::Parse(format!("{} has no test block", manifest.name)))?;

    let version = manifest
        .effective_version()
        .ok_or_else(|| MaltError::Parse(format!("{} has no version", manifest.name)))?;

    let mut vars = BTreeMap::new();
    vars.insert("prefix".to_string(), prefix.display().to_string());
    vars.insert("bin".to_string(), prefix.join("bin").display().to_string());
    vars.insert("staging".to_string(), staging_dir.display().to_string());
    vars.insert("version".to_string(), version);

    let command = substitute(&test.run, &vars)?;
    let argv = split_command(&command)?;

    tracing::info!(%command, "running test command");
    let output = run_command(&argv, Some(staging_dir))?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        tracing::error!(
            %command,
            code,
            stderr = %String::from_utf8_lossy(&output.stderr),
            "test command failed"
        );
        return Err(MaltError::TestFailed { code });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !stdout.contains(&test.assert_match) {
        return Err(MaltError::TestAssertionFailed {
            expected: test.assert_match.clone(),
        });
    }

    Ok(TestReport {
        command,
        output: stdout,
    })
}

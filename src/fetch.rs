//! Resource fetching with checksum verification and progress tracking.
//!
//! Every downloaded file is verified against its declared SHA-256 digest
//! before anything else touches it. A verification failure removes the
//! partial download and aborts the pipeline; there is no retry and no
//! fallback content. Cached files that still match their digest are reused
//! without hitting the network.

use crate::error::{MaltError, Result};
use crate::manifest::Resource;
use futures::future::try_join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Download cache directory (~/.cache/maltster/downloads or equivalent)
pub fn cache_dir() -> PathBuf {
    let base = if let Some(cache_home) = std::env::var_os("XDG_CACHE_HOME") {
        PathBuf::from(cache_home).join("maltster")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".cache/maltster")
    } else {
        PathBuf::from(".cache/maltster")
    };
    base.join("downloads")
}

/// Compute the SHA-256 digest of a file, hex-encoded
pub async fn file_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check a file against an expected SHA-256 digest
pub async fn verify_checksum(path: &Path, expected: &str) -> Result<bool> {
    Ok(file_sha256(path).await? == expected)
}

/// Derive a local filename from a URL's last path segment
fn filename_for_url(name: &str, url: &str) -> String {
    url.rsplit('/')
        .next()
        .and_then(|s| s.split('?').next())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Download `url` into `dest_dir`, verifying its SHA-256 digest.
///
/// An already-cached file that still matches the digest is returned without
/// re-downloading. On mismatch the file is deleted and the fetch fails with
/// [`MaltError::ChecksumMismatch`]; no partial content survives.
pub async fn fetch(
    client: &reqwest::Client,
    name: &str,
    url: &str,
    expected_sha256: &str,
    dest_dir: &Path,
    progress: Option<&MultiProgress>,
) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir).await?;

    let filename = filename_for_url(name, url);
    let output_path = dest_dir.join(&filename);

    // Reuse a verified cached download
    if output_path.exists() {
        if verify_checksum(&output_path, expected_sha256).await? {
            tracing::debug!(path = %output_path.display(), "using cached download");
            return Ok(output_path);
        }
        // Stale or corrupt, re-download
        fs::remove_file(&output_path).await?;
    }

    let pb = if let Some(mp) = progress {
        let pb = mp.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                )
                .map_err(anyhow::Error::from)?
                .progress_chars("#>-"),
        );
        pb.set_message(format!("⬇ {}", name));
        Some(pb)
    } else {
        None
    };

    tracing::debug!(%url, "downloading");
    let mut response = client.get(url).send().await?.error_for_status()?;

    if let Some(pb) = &pb {
        if let Some(total) = response.content_length() {
            pb.set_length(total);
        }
    }

    let mut file = fs::File::create(&output_path).await?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        if let Some(pb) = &pb {
            pb.set_position(downloaded);
        }
    }

    file.flush().await?;

    let actual = file_sha256(&output_path).await?;
    if actual != expected_sha256 {
        fs::remove_file(&output_path).await?;
        if let Some(pb) = &pb {
            pb.finish_with_message(format!("✗ {}", name));
        }
        return Err(MaltError::ChecksumMismatch {
            name: name.to_string(),
            expected: expected_sha256.to_string(),
            actual,
        });
    }

    if let Some(pb) = &pb {
        pb.finish_with_message(format!("✓ {}", name));
    }

    Ok(output_path)
}

/// Download all declared resources concurrently
pub async fn fetch_resources(
    client: &reqwest::Client,
    resources: &[Resource],
    dest_dir: &Path,
) -> Result<Vec<(String, PathBuf)>> {
    let mp = MultiProgress::new();

    let downloads = resources.iter().map(|resource| {
        let mp = &mp;
        async move {
            let path = fetch(
                client,
                &resource.name,
                &resource.url,
                &resource.sha256,
                dest_dir,
                Some(mp),
            )
            .await?;
            Ok::<_, MaltError>((resource.name.clone(), path))
        }
    });

    try_join_all(downloads).await
}

//! Platform detection for matching bottle checksum entries.
//!
//! Bottle tables key precompiled artifacts by platform tag
//! (`arm64_big_sur`, `x86_64_linux`, ...). This module detects the host's
//! tag and matches it against a manifest's bottle table. When no exact tag
//! is present, the universal `all` tag is accepted as a fallback.

use crate::manifest::BottleSpec;
#[cfg(target_os = "macos")]
use anyhow::Context;
use anyhow::Result;
#[cfg(target_os = "macos")]
use std::process::Command;

/// Universal bottle tag accepted by every platform
pub const TAG_ALL: &str = "all";

/// Detect the current system's bottle platform tag.
///
/// # Errors
///
/// Returns an error if:
/// - On macOS: `sw_vers` command is unavailable
/// - On unsupported platforms: Not macOS or Linux
pub fn detect_bottle_tag() -> Result<String> {
    #[cfg(target_os = "macos")]
    {
        // Bottle tags use "arm64" not "aarch64"
        let arch = match std::env::consts::ARCH {
            "aarch64" => "arm64",
            other => other,
        };
        let os_version = macos_version()?;
        let os_name = macos_name(&os_version);

        Ok(format!("{}_{}", arch, os_name))
    }

    #[cfg(target_os = "linux")]
    {
        let arch = match std::env::consts::ARCH {
            "aarch64" => "arm64",
            other => other,
        };
        Ok(format!("{}_linux", arch))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        anyhow::bail!("Unsupported platform")
    }
}

/// Select the bottle checksum matching a platform tag.
///
/// Exact tag match wins; otherwise the `all` tag is used when present.
/// Returns the matched tag and its checksum.
pub fn select_bottle<'a>(bottle: &'a BottleSpec, tag: &str) -> Option<(&'a str, &'a str)> {
    bottle
        .sha256
        .get_key_value(tag)
        .or_else(|| bottle.sha256.get_key_value(TAG_ALL))
        .map(|(k, v)| (k.as_str(), v.as_str()))
}

#[cfg(target_os = "macos")]
fn macos_version() -> Result<String> {
    let output = Command::new("sw_vers")
        .arg("-productVersion")
        .output()
        .context("Failed to run sw_vers")?;

    let version = String::from_utf8(output.stdout)
        .context("Invalid UTF-8 in sw_vers output")?
        .trim()
        .to_string();

    Ok(version)
}

#[cfg(target_os = "macos")]
fn macos_name(version: &str) -> &'static str {
    // Parse major version
    let major: u32 = version
        .split('.')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    match major {
        26 => "tahoe",    // macOS 26 (Tahoe) - year-based versioning
        16 => "tahoe",    // macOS 16 (Tahoe) - compatibility version number
        15 => "sequoia",  // macOS 15
        14 => "sonoma",   // macOS 14
        13 => "ventura",  // macOS 13
        12 => "monterey", // macOS 12
        11 => "big_sur",  // macOS 11
        _ => "sonoma",    // Default to recent compatible version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn bottle(tags: &[(&str, &str)]) -> BottleSpec {
        BottleSpec {
            cellar: None,
            sha256: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_detect_bottle_tag() {
        let tag = detect_bottle_tag().unwrap();
        assert!(!tag.is_empty());
        #[cfg(target_arch = "aarch64")]
        assert!(tag.starts_with("arm64_"));
        #[cfg(target_arch = "x86_64")]
        assert!(tag.starts_with("x86_64_"));
    }

    #[test]
    fn test_select_exact_tag() {
        let b = bottle(&[("arm64_big_sur", "aaa"), ("big_sur", "bbb")]);
        assert_eq!(
            select_bottle(&b, "arm64_big_sur"),
            Some(("arm64_big_sur", "aaa"))
        );
        assert_eq!(select_bottle(&b, "big_sur"), Some(("big_sur", "bbb")));
    }

    #[test]
    fn test_select_all_fallback() {
        let b = bottle(&[("all", "ccc")]);
        assert_eq!(select_bottle(&b, "arm64_sequoia"), Some(("all", "ccc")));
    }

    #[test]
    fn test_select_no_match() {
        let b = bottle(&[("mojave", "ddd")]);
        assert_eq!(select_bottle(&b, "arm64_sequoia"), None);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_macos_names() {
        assert_eq!(macos_name("15.1"), "sequoia");
        assert_eq!(macos_name("14.0"), "sonoma");
        assert_eq!(macos_name("13.0"), "ventura");
        assert_eq!(macos_name("12.0"), "monterey");
    }
}

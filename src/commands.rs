use colored::Colorize;
use maltster::pipeline::{InstallOptions, Pipeline};
use maltster::{Manifest, Result, cellar, platform};
use std::path::Path;

pub fn info(manifest_path: &Path, json: bool) -> Result<()> {
    let manifest = Manifest::from_path(manifest_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    println!("{}", format!("==> {}", manifest.name).bold().green());
    if let Some(desc) = &manifest.desc {
        println!("{}", desc);
    }
    if let Some(homepage) = &manifest.homepage {
        println!("{}: {}", "Homepage".bold(), homepage);
    }
    if let Some(version) = manifest.effective_version() {
        println!("{}: {}", "Version".bold(), version);
    }
    if let Some(license) = &manifest.license {
        println!("{}: {}", "License".bold(), license);
    }
    println!("{}: {}", "Source".bold(), manifest.url);

    let build_deps: Vec<&str> = manifest
        .dependencies
        .iter()
        .filter(|d| d.build)
        .map(|d| d.name.as_str())
        .collect();
    if !build_deps.is_empty() {
        println!("{}: {}", "Build dependencies".bold(), build_deps.join(", "));
    }
    let runtime_deps: Vec<&str> = manifest
        .dependencies
        .iter()
        .filter(|d| !d.build)
        .map(|d| d.name.as_str())
        .collect();
    if !runtime_deps.is_empty() {
        println!("{}: {}", "Dependencies".bold(), runtime_deps.join(", "));
    }

    for conflict in &manifest.conflicts {
        println!(
            "{}: {} {}",
            "Conflicts with".bold(),
            conflict.name,
            format!("({})", conflict.because).dimmed()
        );
    }

    if !manifest.resources.is_empty() {
        println!(
            "{}: {}",
            "Resources".bold(),
            manifest
                .resources
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    if let Some(bottle) = &manifest.bottle {
        match platform::detect_bottle_tag() {
            Ok(tag) => match platform::select_bottle(bottle, &tag) {
                Some((matched, _)) => {
                    println!("{}: {} {}", "Bottle".bold(), "✓".green(), matched.dimmed())
                }
                None => println!("{}: {} for {}", "Bottle".bold(), "none".dimmed(), tag),
            },
            Err(_) => println!("{}: {}", "Bottle".bold(), "unknown platform".dimmed()),
        }
    }

    Ok(())
}

pub async fn fetch(pipeline: &Pipeline, manifest_path: &Path) -> Result<()> {
    let manifest = Manifest::from_path(manifest_path)?;
    println!("{} Fetching {}", "⬇".bold(), manifest.name.cyan());

    let fetched = pipeline.fetch_all(&manifest).await?;
    for (name, path) in &fetched {
        println!("{} {} {}", "✓".green(), name, path.display().to_string().dimmed());
    }

    Ok(())
}

pub async fn install(
    pipeline: &Pipeline,
    manifest_path: &Path,
    skip_link: bool,
    keep_build: bool,
) -> Result<()> {
    let manifest = Manifest::from_path(manifest_path)?;
    println!("{} Installing {}", "📦".bold(), manifest.name.cyan());

    let options = InstallOptions {
        skip_link,
        keep_build,
    };
    let result = pipeline.install(&manifest, options).await?;

    println!(
        "{} Installed {} {} to {} {}",
        "✓".green(),
        result.name.bold(),
        result.version,
        result.path.display(),
        format!("({} ms)", result.time_ms).dimmed()
    );
    if !result.linked {
        println!("{} keg not linked", "⚠".yellow());
    }

    Ok(())
}

pub async fn test(pipeline: &Pipeline, manifest_path: &Path) -> Result<()> {
    let manifest = Manifest::from_path(manifest_path)?;
    println!("{} Testing {}", "🧪".bold(), manifest.name.cyan());

    let report = pipeline.test(&manifest).await?;
    println!("{} {}", "✓".green(), report.command.dimmed());

    Ok(())
}

pub fn list(pipeline: &Pipeline, versions: bool) -> Result<()> {
    let kegs = cellar::list_installed(pipeline.prefix())?;

    if kegs.is_empty() {
        println!("No packages installed in {}", pipeline.prefix().display());
        return Ok(());
    }

    if versions {
        for keg in &kegs {
            println!(
                "{} {} {}",
                keg.name.bold(),
                keg.version,
                format_size(keg.size_bytes()).dimmed()
            );
        }
    } else {
        // Newest version only per package
        let mut seen: Vec<&str> = Vec::new();
        for keg in &kegs {
            if seen.contains(&keg.name.as_str()) {
                continue;
            }
            seen.push(&keg.name);
            let newest = cellar::installed_versions(pipeline.prefix(), &keg.name)?;
            if let Some(newest) = newest.first() {
                println!("{} {}", newest.name.bold(), newest.version);
            }
        }
    }

    Ok(())
}

pub fn uninstall(pipeline: &Pipeline, name: &str) -> Result<()> {
    for result in pipeline.uninstall(name)? {
        println!(
            "{} Uninstalled {} {}",
            "✓".green(),
            result.name.bold(),
            result.version
        );
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("({:.1} MB)", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("({:.1} KB)", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "(0.5 KB)");
        assert_eq!(format_size(3 * 1024 * 1024), "(3.0 MB)");
    }
}

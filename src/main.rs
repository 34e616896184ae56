mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use maltster::Pipeline;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "malt")]
#[command(author, version, about = "A Homebrew-style formula manifest interpreter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a manifest
    Info {
        /// Manifest file path
        manifest: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download and verify the source archive and resources
    Fetch {
        /// Manifest file path
        manifest: PathBuf,
    },

    /// Fetch, build, and install a manifest
    Install {
        /// Manifest file path
        manifest: PathBuf,

        /// Do not link the keg into the prefix bin
        #[arg(long)]
        skip_link: bool,

        /// Keep the build directory for inspection
        #[arg(long)]
        keep_build: bool,
    },

    /// Run a manifest's smoke test against the installed package
    Test {
        /// Manifest file path
        manifest: PathBuf,
    },

    /// List installed packages
    List {
        /// Show all installed versions
        #[arg(long)]
        versions: bool,
    },

    /// Uninstall a package
    Uninstall {
        /// Package name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "warn");
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let pipeline = Pipeline::new()?;

    match cli.command {
        Some(Commands::Info { manifest, json }) => {
            commands::info(&manifest, json)?;
        }
        Some(Commands::Fetch { manifest }) => {
            commands::fetch(&pipeline, &manifest).await?;
        }
        Some(Commands::Install {
            manifest,
            skip_link,
            keep_build,
        }) => {
            commands::install(&pipeline, &manifest, skip_link, keep_build).await?;
        }
        Some(Commands::Test { manifest }) => {
            commands::test(&pipeline, &manifest).await?;
        }
        Some(Commands::List { versions }) => {
            commands::list(&pipeline, versions)?;
        }
        Some(Commands::Uninstall { name }) => {
            commands::uninstall(&pipeline, &name)?;
        }
        None => {
            println!(
                "{} Welcome to malt - a formula manifest interpreter!",
                "🍺".bold()
            );
            println!("\nRun {} to see available commands.", "malt --help".cyan());
        }
    }

    Ok(())
}

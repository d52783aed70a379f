//! xip - create, extract and inspect XIP archives
//!
//! ```bash
//! xip extract sample.xip            # -> output/sample/
//! xip create sample_folder          # -> output/newfolder/sample_folder.xip
//! xip info sample.xip --json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use xip_rs::{build_directory, ArchiveReader, XipConfig};

/// Create, extract and inspect XIP archives
#[derive(Parser)]
#[command(name = "xip")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log per-entry progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract all files from an archive into a folder
    Extract {
        archive: PathBuf,

        /// Destination folder (default: output/<archive name>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep going when an entry cannot be written
        #[arg(long)]
        best_effort: bool,
    },

    /// Create an archive from a folder
    Create {
        folder: PathBuf,

        /// Archive path (default: output/newfolder/<folder name>.xip)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print an archive's header and directory
    Info {
        archive: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => XipConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => XipConfig::default(),
    };

    match cli.command {
        Commands::Extract {
            archive,
            output,
            best_effort,
        } => extract(&archive, output, best_effort, &config),
        Commands::Create { folder, output } => create(&folder, output, &config),
        Commands::Info { archive, json } => info(&archive, json),
    }
}

fn extract(
    archive: &Path,
    output: Option<PathBuf>,
    best_effort: bool,
    config: &XipConfig,
) -> Result<()> {
    let output = output.unwrap_or_else(|| {
        let stem = archive.file_stem().unwrap_or(archive.as_os_str());
        Path::new("output").join(stem)
    });

    let reader = ArchiveReader::open(archive)
        .with_context(|| format!("Failed to read {}", archive.display()))?;

    let mut options = config.extract;
    options.best_effort |= best_effort;

    std::fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let summary = reader
        .extract_to(&output, &options)
        .with_context(|| format!("Failed to extract {}", archive.display()))?;

    println!(
        "Extraction complete: {} written, {} skipped, {} failed.",
        summary.written.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    Ok(())
}

fn create(folder: &Path, output: Option<PathBuf>, config: &XipConfig) -> Result<()> {
    let output = match output {
        Some(path) => path,
        None => {
            let name = folder
                .file_name()
                .context("Folder has no name to derive the archive name from")?;
            let mut file_name = name.to_os_string();
            file_name.push(".xip");
            Path::new("output").join("newfolder").join(file_name)
        }
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let report = build_directory(folder, &output, config)
        .with_context(|| format!("Failed to create archive from {}", folder.display()))?;

    if report.needs_second_pass {
        println!("Mesh buffers were written but are not in the archive yet.");
        println!("Run the same command again to include them.");
        std::process::exit(1);
    }

    println!(
        "XIP archive created: {} ({} entries, {} meshes)",
        report.archive_path.display(),
        report.file_count,
        report.mesh_count
    );
    Ok(())
}

fn info(archive: &Path, json: bool) -> Result<()> {
    let reader = ArchiveReader::open(archive)
        .with_context(|| format!("Failed to read {}", archive.display()))?;
    let report = reader.info()?;

    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
    }
    Ok(())
}

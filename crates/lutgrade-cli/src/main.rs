//! lutgrade - 3D LUT conversion and grading CLI
//!
//! Converts `.cube` text LUT libraries into the packed `.clut` binary
//! format, applies LUTs to PNG images and inspects `.clut` containers.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "lutgrade")]
#[command(author, version, about = "3D LUT conversion and grading tool")]
#[command(long_about = "
Converts .cube text LUTs into the packed .clut binary format, applies
LUTs to PNG images and inspects .clut containers.

Examples:
  lutgrade convert luts/ public/LUTS -m public/lut-manifest.json
  lutgrade apply photo.png -l looks/teal_orange.cube -o graded.png
  lutgrade apply photo.png -l LUTS/film/kodak_2383.clut -o graded.png
  lutgrade info LUTS/film/kodak_2383.clut
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a directory tree of .cube files to .clut with a manifest
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),

    /// Apply a LUT to a PNG image
    #[command(visible_alias = "a")]
    Apply(ApplyArgs),

    /// Display .clut container information
    #[command(visible_alias = "i")]
    Info(InfoArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Source directory of category subdirectories with .cube files
    src: PathBuf,

    /// Destination directory for .clut output
    dest: PathBuf,

    /// Manifest output path (JSON)
    #[arg(short, long)]
    manifest: Option<PathBuf>,
}

#[derive(Args)]
struct ApplyArgs {
    /// Input PNG image
    input: PathBuf,

    /// LUT file (.cube or .clut)
    #[arg(short, long)]
    lut: PathBuf,

    /// Output PNG image
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct InfoArgs {
    /// .clut file(s)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// Machine-readable output (JSON)
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Convert(args) => commands::convert::run(args, cli.verbose),
        Commands::Apply(args) => commands::apply::run(args, cli.verbose),
        Commands::Info(args) => commands::info::run(args, cli.verbose),
    }
}

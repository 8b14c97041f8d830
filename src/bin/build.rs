use std::fs::File;
use std::io::{stdin, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use phrasefind::builder::build_artifacts;
use phrasefind::config::BuildConfig;

/// Compiles scored phrases into the four co-located artifact files
/// (automaton.daac, payloads.bin, manifest.json, vocab.json), staged
/// then renamed atomically into `out_dir`.
#[derive(Parser, Debug)]
#[command(author, version, about = "Build a matcher artifact set from scored phrases", long_about = None)]
struct Args {
    /// Path to the build config JSON (version, tokenizer, separator_id, ...)
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Scored phrases (scorer output); defaults to stdin, as does the
    /// literal path "-"
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Directory to write the artifact set into; must not already exist
    /// as anything other than a prior build of the same kind
    #[arg(long, value_name = "DIR")]
    out_dir: PathBuf,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    let config_bytes = std::fs::read(&args.config)
        .with_context(|| format!("reading config {}", args.config.display()))?;
    let config: BuildConfig =
        serde_json::from_slice(&config_bytes).context("parsing build config")?;

    let input = open_input(args.input.as_deref())?;
    let count = build_artifacts(input, &config, &args.out_dir).context("building artifacts")?;

    println!("Built {count} patterns into {}", args.out_dir.display());
    Ok(())
}

/// Opens `path` for reading, treating `None` and the literal path `-`
/// identically as an alias for standard input.
fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path).with_context(|| format!("opening input {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(stdin().lock()))),
    }
}

use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use phrasefind::config::ScoringConfig;
use phrasefind::scorer::score_phrases;

/// Scores domain candidate phrases against a background distribution and
/// writes surviving phrases, optionally assigning dense phrase IDs.
#[derive(Parser, Debug)]
#[command(author, version, about = "Score candidate phrases by salience against a background corpus", long_about = None)]
struct Args {
    /// Path to the scoring config JSON (method, min_salience, min_domain_count, ...)
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Domain candidate phrases (miner output for the domain corpus); the
    /// literal path "-" reads from stdin
    #[arg(long, value_name = "PATH")]
    domain: PathBuf,

    /// Background candidate phrases (miner output for the background
    /// corpus); the literal path "-" reads from stdin
    #[arg(long, value_name = "PATH")]
    background: PathBuf,

    /// Output path for scored phrases; defaults to stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

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
    let config: ScoringConfig =
        serde_json::from_slice(&config_bytes).context("parsing scoring config")?;

    let domain = open_input(&args.domain)?;
    let background = open_input(&args.background)?;

    match &args.output {
        Some(path) => {
            let writer = BufWriter::new(
                File::create(path).with_context(|| format!("creating output {}", path.display()))?,
            );
            score_phrases(domain, background, &config, writer).context("scoring phrases")?;
        }
        None => {
            let writer = BufWriter::new(stdout().lock());
            score_phrases(domain, background, &config, writer).context("scoring phrases")?;
        }
    }
    Ok(())
}

/// Opens `path` for reading, treating the literal path `-` as an alias
/// for standard input.
fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        Ok(Box::new(BufReader::new(stdin().lock())))
    } else {
        let file = File::open(path).with_context(|| format!("opening input {}", path.display()))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

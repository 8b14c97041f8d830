use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use phrasefind::config::MiningConfig;
use phrasefind::miner::mine_corpus;

/// Streams a line-delimited-JSON token corpus and writes n-gram
/// candidate counts meeting `min_count`.
#[derive(Parser, Debug)]
#[command(author, version, about = "Mine n-gram candidates from a tokenized corpus", long_about = None)]
struct Args {
    /// Path to the mining config JSON (min_n, max_n, min_count)
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Input corpus (line-delimited JSON documents); defaults to stdin,
    /// as does the literal path "-"
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output path for candidate phrases; defaults to stdout
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
    let config: MiningConfig =
        serde_json::from_slice(&config_bytes).context("parsing mining config")?;

    let input = open_input(args.input.as_deref())?;
    run(input, &config, args.output.as_deref())
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

fn run<R: std::io::BufRead>(input: R, config: &MiningConfig, output: Option<&std::path::Path>) -> Result<()> {
    match output {
        Some(path) => {
            let writer = BufWriter::new(File::create(path).with_context(|| format!("creating output {}", path.display()))?);
            mine_corpus(input, config, writer).context("mining corpus")?;
        }
        None => {
            let writer = BufWriter::new(stdout().lock());
            mine_corpus(input, config, writer).context("mining corpus")?;
        }
    }
    Ok(())
}

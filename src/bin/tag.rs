use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use phrasefind::config::TaggerConfig;
use phrasefind::matcher::{ArtifactPaths, MatcherHandle};
use phrasefind::tagger::tag_with_handle;

/// Loads a matcher artifact set and tags a corpus of pre-tokenized
/// documents, writing spans per document. With `--watch-secs`, reloads
/// the artifact set on a background interval so long-running callers
/// pick up a rebuilt vocabulary without restarting.
#[derive(Parser, Debug)]
#[command(author, version, about = "Tag a tokenized corpus with matched phrases", long_about = None)]
struct Args {
    /// Path to the tagger config JSON (artifact paths, policy, max_spans, label)
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Input corpus (line-delimited JSON documents); defaults to stdin,
    /// as does the literal path "-"
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output path for tagged documents; defaults to stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Reload the artifact set every N seconds on a background thread
    #[arg(long, value_name = "SECS")]
    watch_secs: Option<u64>,

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
    let config: TaggerConfig =
        serde_json::from_slice(&config_bytes).context("parsing tagger config")?;

    let paths = ArtifactPaths {
        automaton: config.automaton_path.clone(),
        payloads: config.payloads_path.clone(),
        manifest: config.manifest_path.clone(),
        vocab: config.vocab_path.clone(),
    };

    let handle = MatcherHandle::new();
    handle.load(&paths).context("loading matcher artifacts")?;

    if let Some(secs) = args.watch_secs {
        let watch_handle = handle.clone();
        let watch_paths = paths.clone();
        std::thread::spawn(move || loop {
            std::thread::sleep(Duration::from_secs(secs));
            if let Err(err) = watch_handle.load(&watch_paths) {
                tracing::warn!(error = %err, "artifact reload failed, keeping previous snapshot");
            } else {
                tracing::info!("artifact set reloaded");
            }
        });
    }

    let input = open_input(args.input.as_deref())?;

    match &args.output {
        Some(path) => {
            let writer = BufWriter::new(
                File::create(path).with_context(|| format!("creating output {}", path.display()))?,
            );
            tag_with_handle(&handle, input, &config, writer).context("tagging corpus")?;
        }
        None => {
            let writer = BufWriter::new(stdout().lock());
            tag_with_handle(&handle, input, &config, writer).context("tagging corpus")?;
        }
    }

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

//! Artifact builder: compiles scored phrases into the four co-located
//! artifact files.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use crate::automaton;
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::model::{Manifest, PayloadRecord, ScoredPhrase, PAYLOAD_RECORD_SIZE};
use crate::vocab::Vocabulary;

pub const AUTOMATON_FILE: &str = "automaton.daac";
pub const PAYLOADS_FILE: &str = "payloads.bin";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const VOCAB_FILE: &str = "vocab.json";

fn read_scored_phrases<R: BufRead>(input: R) -> Result<Vec<ScoredPhrase>, BuildError> {
    let mut phrases = Vec::new();
    for (line_no, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let phrase: ScoredPhrase =
            serde_json::from_str(&line).map_err(|source| BuildError::MalformedLine {
                line: line_no + 1,
                source,
            })?;
        phrases.push(phrase);
    }
    Ok(phrases)
}

fn encode_pattern(vocab: &Vocabulary, phrase: &ScoredPhrase) -> Result<Vec<u8>, BuildError> {
    let mut bytes = Vec::with_capacity(phrase.tokens.len() * 4);
    for token in &phrase.tokens {
        let normalized = crate::model::normalize_token(token);
        let id = vocab.lookup(&normalized);
        if id == crate::vocab::UNK_ID {
            return Err(BuildError::UnknownVocabToken {
                phrase_id: phrase.phrase_id,
                token: normalized,
            });
        }
        bytes.extend_from_slice(&id.to_le_bytes());
    }
    Ok(bytes)
}

/// Assembles the vocabulary, encodes patterns, builds the automaton, and
/// stages all four artifact files under a temporary directory before
/// renaming it into `out_dir`, so a reader never sees a torn artifact
/// set. `out_dir` must not already exist.
pub fn build_artifacts<R: BufRead>(
    input: R,
    config: &BuildConfig,
    out_dir: &Path,
) -> Result<u32, BuildError> {
    config.validate()?;

    let phrases = read_scored_phrases(input)?;
    if phrases.is_empty() {
        return Err(BuildError::EmptyPhraseList);
    }

    let mut seen_ids = HashSet::with_capacity(phrases.len());
    for phrase in &phrases {
        if !seen_ids.insert(phrase.phrase_id) {
            return Err(BuildError::DuplicatePhraseId(phrase.phrase_id));
        }
    }

    let all_tokens = phrases
        .iter()
        .flat_map(|p| p.tokens.iter())
        .map(|t| crate::model::normalize_token(t));
    let owned_tokens: Vec<String> = all_tokens.collect();
    let vocab = Vocabulary::build(owned_tokens.iter().map(String::as_str), config.separator_id)?;

    let mut patterns = Vec::with_capacity(phrases.len());
    let mut payloads = Vec::with_capacity(phrases.len());
    let mut seen_patterns: HashMap<Vec<u8>, u32> = HashMap::with_capacity(phrases.len());

    for phrase in &phrases {
        let pattern = encode_pattern(&vocab, phrase)?;
        if let Some(&existing_id) = seen_patterns.get(&pattern) {
            return Err(BuildError::DuplicatePattern(phrase.phrase_id, existing_id));
        }
        seen_patterns.insert(pattern.clone(), phrase.phrase_id);

        payloads.push(PayloadRecord {
            phrase_id: phrase.phrase_id,
            salience: phrase.salience,
            count: phrase.domain_count,
            n: phrase.tokens.len() as u8,
        });
        patterns.push(pattern);
    }

    // Validate the automaton can actually be built before touching disk.
    automaton::build_automaton(&patterns)
        .map_err(|e| BuildError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;

    let parent = out_dir.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".phrasefind-build-")
        .tempdir_in(parent)?;

    automaton::write_patterns(&staging.path().join(AUTOMATON_FILE), &patterns)?;

    write_payloads(&staging.path().join(PAYLOADS_FILE), &payloads)?;

    let manifest = Manifest {
        version: config.version.clone(),
        tokenizer: config.tokenizer.clone(),
        num_patterns: patterns.len() as u32,
        min_count: config.min_count,
        salience_threshold: config.salience_threshold,
        built_at: chrono::Utc::now().to_rfc3339(),
        separator_id: config.separator_id,
    };
    write_manifest(&staging.path().join(MANIFEST_FILE), &manifest)?;

    vocab.save(&staging.path().join(VOCAB_FILE))?;

    if out_dir.exists() {
        std::fs::remove_dir_all(out_dir)?;
    }
    let staged_path = staging.into_path();
    std::fs::rename(&staged_path, out_dir)?;

    tracing::info!(num_patterns = patterns.len(), out_dir = %out_dir.display(), "build complete");
    Ok(patterns.len() as u32)
}

fn write_payloads(path: &Path, payloads: &[PayloadRecord]) -> Result<(), BuildError> {
    let mut buf = Vec::with_capacity(payloads.len() * PAYLOAD_RECORD_SIZE);
    for record in payloads {
        buf.extend_from_slice(&record.to_bytes());
    }
    std::fs::write(path, buf)?;
    Ok(())
}

fn write_manifest(path: &Path, manifest: &Manifest) -> Result<(), BuildError> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, manifest).map_err(|source| BuildError::Serialize {
        what: "manifest",
        source,
    })
}

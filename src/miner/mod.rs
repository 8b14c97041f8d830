//! Streaming n-gram miner.
//!
//! Maintains a bounded (not corpus-sized) in-memory count table: the
//! corpus itself is streamed one document at a time.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use ahash::RandomState;

use crate::config::MiningConfig;
use crate::error::MinerError;
use crate::model::{normalize_token, CandidatePhrase, Document};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MiningStats {
    pub documents: u64,
    pub tokens: u64,
    pub unique_ngrams: u64,
    pub after_min_count: u64,
}

impl MiningStats {
    pub fn report(&self, min_count: u32) {
        tracing::info!(
            documents = self.documents,
            tokens = self.tokens,
            unique_ngrams = self.unique_ngrams,
            after_min_count = self.after_min_count,
            "mining complete"
        );
        eprintln!("Total documents: {}", self.documents);
        eprintln!("Total tokens: {}", self.tokens);
        eprintln!("Unique n-grams: {}", self.unique_ngrams);
        eprintln!("After min_count={min_count}: {}", self.after_min_count);
    }
}

/// Streams `input` (line-delimited JSON documents), extracts every n-gram
/// of length `[min_n, max_n]`, and writes `{tokens, count}` lines for
/// every n-gram whose corpus-wide count is `>= min_count`.
///
/// Counts are widened to `u64` internally; narrowing back to the `u32`
/// output field is a hard error on overflow rather than a silent wrap.
pub fn mine_corpus<R: BufRead, W: Write>(
    input: R,
    config: &MiningConfig,
    mut output: W,
) -> Result<MiningStats, MinerError> {
    config.validate()?;

    let mut counts: HashMap<Vec<String>, u64, RandomState> = HashMap::default();
    let mut stats = MiningStats::default();

    for (line_no, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: Document = serde_json::from_str(&line).map_err(|source| MinerError::MalformedLine {
            line: line_no + 1,
            source,
        })?;

        if doc.tokens.is_empty() {
            continue;
        }
        stats.documents += 1;
        stats.tokens += doc.tokens.len() as u64;

        let normalized: Vec<String> = doc.tokens.iter().map(|t| normalize_token(t)).collect();
        let len = normalized.len();

        for i in 0..len {
            let max_k = config.max_n.min((len - i) as u32);
            if max_k < config.min_n {
                continue;
            }
            for k in config.min_n..=max_k {
                let gram = normalized[i..i + k as usize].to_vec();
                *counts.entry(gram).or_insert(0) += 1;
            }
        }
    }

    stats.unique_ngrams = counts.len() as u64;

    for (tokens, count) in &counts {
        if *count < config.min_count as u64 {
            continue;
        }
        let narrowed: u32 = (*count).try_into().map_err(|_| MinerError::CountOverflow {
            tokens: tokens.clone(),
            count: *count,
        })?;
        stats.after_min_count += 1;
        let candidate = CandidatePhrase {
            tokens: tokens.clone(),
            count: narrowed,
        };
        serde_json::to_writer(&mut output, &candidate)
            .map_err(|e| MinerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        output.write_all(b"\n")?;
    }

    stats.report(config.min_count);
    Ok(stats)
}

//! Salience scorer: ranks domain phrases against a background
//! distribution and assigns dense phrase IDs.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use ahash::RandomState;

use crate::config::{ScoreMethod, ScoringConfig};
use crate::error::ScorerError;
use crate::model::{normalize_token, CandidatePhrase, ScoredPhrase};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringStats {
    pub domain_phrases: u64,
    pub background_phrases: u64,
    pub after_domain_filter: u64,
    pub after_salience_filter: u64,
}

impl ScoringStats {
    pub fn report(&self) {
        tracing::info!(
            domain_phrases = self.domain_phrases,
            background_phrases = self.background_phrases,
            after_domain_filter = self.after_domain_filter,
            after_salience_filter = self.after_salience_filter,
            "scoring complete"
        );
        eprintln!("Domain phrases: {}", self.domain_phrases);
        eprintln!("Background phrases: {}", self.background_phrases);
        eprintln!("After domain filter: {}", self.after_domain_filter);
        eprintln!("After salience filter: {}", self.after_salience_filter);
    }
}

fn read_table<R: BufRead>(input: R) -> Result<HashMap<Vec<String>, u64, RandomState>, ScorerError> {
    let mut table: HashMap<Vec<String>, u64, RandomState> = HashMap::default();
    for (line_no, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let candidate: CandidatePhrase =
            serde_json::from_str(&line).map_err(|source| ScorerError::MalformedLine {
                line: line_no + 1,
                source,
            })?;
        let normalized: Vec<String> = candidate.tokens.iter().map(|t| normalize_token(t)).collect();
        table.insert(normalized, candidate.count as u64);
    }
    Ok(table)
}

fn salience(
    method: ScoreMethod,
    domain_count: u64,
    background_count: u64,
    total_domain: u64,
    total_background: u64,
) -> f64 {
    match method {
        ScoreMethod::Ratio => domain_count as f64 / (background_count as f64 + 1.0),
        ScoreMethod::Pmi => {
            let p_domain = domain_count as f64 / total_domain.max(1) as f64;
            let background_smoothed = if background_count == 0 {
                0.5
            } else {
                background_count as f64
            };
            let p_background = background_smoothed / total_background.max(1) as f64;
            (p_domain / p_background).log2()
        }
        ScoreMethod::Tfidf => {
            // Documented approximation: document frequency is proxied by
            // background_count, and N_docs by total_background.
            let tf = domain_count as f64 / total_domain.max(1) as f64;
            let df = background_count as f64;
            let n_docs = total_background as f64;
            tf * ((1.0 + n_docs) / (1.0 + df)).ln()
        }
    }
}

/// Scores every domain phrase against the background table, filters, and
/// (optionally) assigns dense phrase IDs, writing `ScoredPhrase` lines.
pub fn score_phrases<R1: BufRead, R2: BufRead, W: Write>(
    domain_input: R1,
    background_input: R2,
    config: &ScoringConfig,
    mut output: W,
) -> Result<ScoringStats, ScorerError> {
    config.validate()?;

    let domain = read_table(domain_input)?;
    let background = read_table(background_input)?;

    let total_domain: u64 = domain.values().sum();
    let total_background: u64 = background.values().sum();

    let mut stats = ScoringStats {
        domain_phrases: domain.len() as u64,
        background_phrases: background.len() as u64,
        ..Default::default()
    };

    struct Survivor {
        tokens: Vec<String>,
        salience: f64,
        domain_count: u32,
        background_count: u32,
    }

    let mut survivors = Vec::new();
    for (tokens, &domain_count) in &domain {
        if domain_count < config.min_domain_count as u64 {
            continue;
        }
        stats.after_domain_filter += 1;

        let background_count = background.get(tokens).copied().unwrap_or(0);
        let s = salience(config.method, domain_count, background_count, total_domain, total_background);
        if s < config.min_salience {
            continue;
        }
        stats.after_salience_filter += 1;

        survivors.push(Survivor {
            tokens: tokens.clone(),
            salience: s,
            domain_count: domain_count as u32,
            background_count: background_count as u32,
        });
    }

    if config.assign_phrase_ids {
        survivors.sort_by(|a, b| {
            b.salience
                .partial_cmp(&a.salience)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.tokens.cmp(&b.tokens))
        });
    }

    for (i, survivor) in survivors.iter().enumerate() {
        let phrase_id = if config.assign_phrase_ids {
            config.starting_phrase_id + i as u32
        } else {
            0
        };
        let scored = ScoredPhrase {
            tokens: survivor.tokens.clone(),
            salience: survivor.salience as f32,
            domain_count: survivor.domain_count,
            background_count: survivor.background_count,
            phrase_id,
        };
        serde_json::to_writer(&mut output, &scored)
            .map_err(|e| ScorerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        output.write_all(b"\n")?;
    }

    stats.report();
    Ok(stats)
}

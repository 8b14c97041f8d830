//! Stage configuration types.
//!
//! Each stage reads its configuration from a JSON file given on the CLI.
//! Fields mirror the external artifact contract described in the module
//! docs; validation is fatal and happens before any I/O begins.

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, MinerError, ScorerError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    pub min_n: u32,
    pub max_n: u32,
    pub min_count: u32,
}

impl MiningConfig {
    pub fn validate(&self) -> Result<(), MinerError> {
        if self.min_n == 0 {
            return Err(MinerError::Config("min_n must be >= 1".into()));
        }
        if self.max_n < self.min_n {
            return Err(MinerError::Config(format!(
                "max_n ({}) must be >= min_n ({})",
                self.max_n, self.min_n
            )));
        }
        if self.max_n > 5 {
            return Err(MinerError::Config(format!(
                "max_n ({}) exceeds the supported upper bound of 5",
                self.max_n
            )));
        }
        if self.min_count == 0 {
            return Err(MinerError::Config("min_count must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMethod {
    Ratio,
    Pmi,
    Tfidf,
}

impl Default for ScoreMethod {
    fn default() -> Self {
        ScoreMethod::Ratio
    }
}

fn default_starting_phrase_id() -> u32 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub method: ScoreMethod,
    pub min_salience: f64,
    pub min_domain_count: u32,
    #[serde(default)]
    pub assign_phrase_ids: bool,
    #[serde(default = "default_starting_phrase_id")]
    pub starting_phrase_id: u32,
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ScorerError> {
        if !self.min_salience.is_finite() {
            return Err(ScorerError::Config("min_salience must be finite".into()));
        }
        Ok(())
    }
}

fn default_separator_id() -> u32 {
    4_294_967_294
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    pub version: String,
    pub tokenizer: String,
    #[serde(default = "default_separator_id")]
    pub separator_id: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub salience_threshold: Option<f32>,
}

impl BuildConfig {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.version.trim().is_empty() {
            return Err(BuildError::Config("version must not be empty".into()));
        }
        if self.separator_id == 0 {
            return Err(BuildError::Config(
                "separator_id must not collide with the <UNK> sentinel (0)".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    LeftmostLongest,
    LeftmostFirst,
    SalienceMax,
    /// Bypasses overlap resolution entirely; only meaningful for the tagger.
    All,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy::LeftmostLongest
    }
}

fn default_max_spans() -> usize {
    64
}

fn default_label() -> String {
    "PHRASE".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    pub automaton_path: std::path::PathBuf,
    pub payloads_path: std::path::PathBuf,
    pub manifest_path: std::path::PathBuf,
    pub vocab_path: std::path::PathBuf,
    #[serde(default)]
    pub policy: MatchPolicy,
    #[serde(default = "default_max_spans")]
    pub max_spans: usize,
    #[serde(default = "default_label")]
    pub label: String,
}

impl TaggerConfig {
    pub fn validate(&self) -> Result<(), crate::error::MatchError> {
        if self.max_spans == 0 {
            return Err(crate::error::MatchError::Config(
                "max_spans must be >= 1".into(),
            ));
        }
        if self.label.trim().is_empty() {
            return Err(crate::error::MatchError::Config(
                "label must not be empty".into(),
            ));
        }
        Ok(())
    }
}

//! Core data types shared across the pipeline: documents, n-grams,
//! phrases, spans, and the fixed binary payload record.

use serde::{Deserialize, Serialize};

/// Lowercases a token on ingress, per the case-normalization rule that
/// applies at every stage boundary.
pub fn normalize_token(token: &str) -> String {
    token.to_lowercase()
}

/// A pre-tokenized document as read by the miner and the tagger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub doc_id: Option<String>,
}

/// `{"tokens": [...], "count": N}` — miner output, scorer domain/background input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePhrase {
    pub tokens: Vec<String>,
    pub count: u32,
}

/// `{"tokens": [...], "salience": f32, "domain_count": N, "background_count": N, "phrase_id": N}`
/// — scorer output, builder input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPhrase {
    pub tokens: Vec<String>,
    pub salience: f32,
    pub domain_count: u32,
    pub background_count: u32,
    pub phrase_id: u32,
}

/// A resolved match: the internal record produced by the matcher before
/// any tagger-specific labeling is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    pub phrase_id: u32,
    pub salience: f32,
    pub count: u32,
    pub n: u8,
}

/// A span as it appears in tagged-corpus output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerSpan {
    pub start: usize,
    pub end: usize,
    pub phrase_id: u32,
    pub label: String,
}

/// `{"doc_id": "...", "tokens": [...], "spans": [...]}` — tagger output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedDocument {
    pub doc_id: String,
    pub tokens: Vec<String>,
    pub spans: Vec<TaggerSpan>,
}

/// Fixed 17-byte payload record, little-endian, indexed by pattern
/// insertion order. 4 bytes of reserved padding sit between `count` and
/// `n` to preserve on-disk layout compatibility; they are always zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayloadRecord {
    pub phrase_id: u32,
    pub salience: f32,
    pub count: u32,
    pub n: u8,
}

pub const PAYLOAD_RECORD_SIZE: usize = 17;

impl PayloadRecord {
    pub fn to_bytes(self) -> [u8; PAYLOAD_RECORD_SIZE] {
        let mut buf = [0u8; PAYLOAD_RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.phrase_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.salience.to_le_bytes());
        buf[8..12].copy_from_slice(&self.count.to_le_bytes());
        // bytes 12..16 are reserved padding, left zeroed.
        buf[16] = self.n;
        buf
    }

    pub fn from_bytes(buf: &[u8; PAYLOAD_RECORD_SIZE]) -> Self {
        let phrase_id = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let salience = f32::from_le_bytes(buf[4..8].try_into().unwrap());
        let count = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        let n = buf[16];
        PayloadRecord {
            phrase_id,
            salience,
            count,
            n,
        }
    }
}

/// Build configuration and manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub tokenizer: String,
    pub num_patterns: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salience_threshold: Option<f32>,
    pub built_at: String,
    pub separator_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabFile {
    pub tokens: std::collections::HashMap<String, u32>,
    pub special_tokens: std::collections::HashMap<String, u32>,
    pub vocab_size: u32,
    pub separator_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_record_round_trips() {
        let record = PayloadRecord {
            phrase_id: 1042,
            salience: 408.33,
            count: 2450,
            n: 2,
        };
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), PAYLOAD_RECORD_SIZE);
        // padding bytes must be zero
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        let back = PayloadRecord::from_bytes(&bytes);
        assert_eq!(back, record);
    }

    #[test]
    fn normalize_token_lowercases() {
        assert_eq!(normalize_token("CDK10"), "cdk10");
        assert_eq!(normalize_token("Rat"), "rat");
    }
}

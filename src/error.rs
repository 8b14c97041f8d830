//! Error types for the four pipeline stages.
//!
//! Each stage gets its own focused error enum rather than one crate-wide
//! error type, following the small-per-concern style the rest of this
//! codebase uses for its error types. Library errors are never panics;
//! the CLI binaries wrap them in `anyhow::Context` for a human message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MinerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input on line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("n-gram count for {tokens:?} overflowed u32 (count={count})")]
    CountOverflow { tokens: Vec<String>, count: u64 },

    #[error("invalid mining config: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record on line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid scoring config: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed phrase record on line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("empty phrase list: a build requires at least one scored phrase")]
    EmptyPhraseList,

    #[error("duplicate phrase_id {0} in builder input")]
    DuplicatePhraseId(u32),

    #[error("duplicate pattern for phrase_id {0} (identical token sequence already inserted as phrase_id {1})")]
    DuplicatePattern(u32, u32),

    #[error("token {token:?} collides with the reserved separator_id {separator_id}")]
    SeparatorCollision { token: String, separator_id: u32 },

    #[error("phrase {phrase_id} contains a token absent from its own vocabulary pass: {token:?}")]
    UnknownVocabToken { phrase_id: u32, token: String },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid build config: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum MatchError {
    /// A programmer error: the caller must `load()` an artifact set before
    /// matching and may retry once it has. Distinguished from the data
    /// errors below so callers can tell the two apart.
    #[error("matcher has no artifact set loaded; call load() first")]
    NotLoaded,

    #[error("I/O error loading artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt automaton file {path}: {reason}")]
    CorruptAutomaton { path: String, reason: String },

    #[error(
        "artifact mismatch: manifest reports num_patterns={manifest}, payload table has {payloads}, automaton has {automaton}"
    )]
    ArtifactMismatch {
        manifest: u32,
        payloads: u32,
        automaton: u32,
    },

    #[error("payloads.bin size {size} is not a multiple of the 17-byte record width")]
    MalformedPayloadTable { size: u64 },

    #[error("failed to build automaton: {0}")]
    AutomatonBuild(#[from] aho_corasick::BuildError),

    #[error("invalid tagger config: {0}")]
    Config(String),
}

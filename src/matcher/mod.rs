//! Matcher: loads an artifact set and resolves overlapping automaton
//! hits under a configurable policy.

mod policy;
mod stats;

pub use policy::resolve_spans;
pub use stats::MatcherStats;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aho_corasick::AhoCorasick;
use arc_swap::ArcSwapOption;

use crate::automaton;
use crate::builder::{AUTOMATON_FILE, MANIFEST_FILE, PAYLOADS_FILE, VOCAB_FILE};
use crate::config::MatchPolicy;
use crate::error::MatchError;
use crate::model::{Manifest, MatchSpan, PayloadRecord, PAYLOAD_RECORD_SIZE};
use crate::vocab::Vocabulary;

/// Paths to the four artifact files, as given to `MatcherHandle::load`.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub automaton: PathBuf,
    pub payloads: PathBuf,
    pub manifest: PathBuf,
    pub vocab: PathBuf,
}

impl ArtifactPaths {
    /// Convenience constructor for the common layout of one artifact
    /// directory per build.
    pub fn in_dir(dir: &Path) -> Self {
        ArtifactPaths {
            automaton: dir.join(AUTOMATON_FILE),
            payloads: dir.join(PAYLOADS_FILE),
            manifest: dir.join(MANIFEST_FILE),
            vocab: dir.join(VOCAB_FILE),
        }
    }
}

pub(crate) struct LoadedArtifact {
    pub automaton: AhoCorasick,
    pub payloads: Vec<PayloadRecord>,
    pub vocab: Vocabulary,
    pub manifest: Manifest,
    pub loaded_at_ms: u64,
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn load_artifact(paths: &ArtifactPaths) -> Result<LoadedArtifact, MatchError> {
    let manifest_bytes = std::fs::read(&paths.manifest)?;
    let manifest: Manifest = serde_json::from_slice(&manifest_bytes)?;

    let (automaton, automaton_count) = automaton::load_automaton(&paths.automaton)?;

    let payload_bytes = std::fs::read(&paths.payloads)?;
    if payload_bytes.len() % PAYLOAD_RECORD_SIZE != 0 {
        return Err(MatchError::MalformedPayloadTable {
            size: payload_bytes.len() as u64,
        });
    }
    let payloads: Vec<PayloadRecord> = payload_bytes
        .chunks_exact(PAYLOAD_RECORD_SIZE)
        .map(|chunk| PayloadRecord::from_bytes(chunk.try_into().unwrap()))
        .collect();

    if manifest.num_patterns != payloads.len() as u32 || manifest.num_patterns != automaton_count {
        return Err(MatchError::ArtifactMismatch {
            manifest: manifest.num_patterns,
            payloads: payloads.len() as u32,
            automaton: automaton_count,
        });
    }

    let vocab = Vocabulary::load(&paths.vocab)?;

    Ok(LoadedArtifact {
        automaton,
        payloads,
        vocab,
        manifest,
        loaded_at_ms: now_ms(),
    })
}

/// A snapshot of matcher health and counters.
#[derive(Debug, Clone, Copy)]
pub struct MatcherHealth {
    pub loaded: bool,
    pub num_patterns: u32,
    pub loaded_at_ms: u64,
    pub heap_mb: f64,
    pub hits_total: u64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
}

/// Thread-safe, hot-reloadable handle to a loaded artifact set. Cheap to
/// clone: internally it is an `Arc` around an `ArcSwapOption`, an explicit
/// handle a caller constructs and passes around rather than a
/// process-global matcher singleton.
#[derive(Clone)]
pub struct MatcherHandle {
    artifact: Arc<ArcSwapOption<LoadedArtifact>>,
    stats: Arc<MatcherStats>,
}

impl Default for MatcherHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl MatcherHandle {
    pub fn new() -> Self {
        MatcherHandle {
            artifact: Arc::new(ArcSwapOption::empty()),
            stats: Arc::new(MatcherStats::new()),
        }
    }

    /// Loads (or hot-reloads) an artifact set. Readers mid-match continue
    /// against whichever snapshot they already observed; the swap itself
    /// is the only exclusive section.
    pub fn load(&self, paths: &ArtifactPaths) -> Result<(), MatchError> {
        let loaded = load_artifact(paths)?;
        self.artifact.store(Some(Arc::new(loaded)));
        Ok(())
    }

    pub fn healthcheck(&self) -> bool {
        match self.artifact.load().as_ref() {
            Some(artifact) => artifact.manifest.num_patterns > 0,
            None => false,
        }
    }

    pub fn health(&self) -> MatcherHealth {
        let guard = self.artifact.load();
        match guard.as_ref() {
            Some(artifact) => {
                let (p50, p95, p99) = self.stats.percentiles_us();
                MatcherHealth {
                    loaded: true,
                    num_patterns: artifact.manifest.num_patterns,
                    loaded_at_ms: artifact.loaded_at_ms,
                    heap_mb: heap_mb_of(artifact),
                    hits_total: self.stats.hits_total(),
                    p50_us: p50,
                    p95_us: p95,
                    p99_us: p99,
                }
            }
            None => MatcherHealth {
                loaded: false,
                num_patterns: 0,
                loaded_at_ms: 0,
                heap_mb: 0.0,
                hits_total: self.stats.hits_total(),
                p50_us: 0.0,
                p95_us: 0.0,
                p99_us: 0.0,
            },
        }
    }

    /// Looks up each token's ID, lowercase-normalizing first. Unknown
    /// tokens map to the `<UNK>` sentinel (ID 0) and cannot match
    /// anything downstream.
    pub fn encode_tokens(&self, tokens: &[String]) -> Result<Vec<u32>, MatchError> {
        let guard = self.artifact.load();
        let artifact = guard.as_ref().ok_or(MatchError::NotLoaded)?;
        Ok(artifact.vocab.encode(tokens))
    }

    /// Runs the automaton over an already-encoded token-ID sequence and
    /// resolves overlaps under `policy`.
    pub fn match_ids(
        &self,
        ids: &[u32],
        policy: MatchPolicy,
        max_spans: usize,
    ) -> Result<Vec<MatchSpan>, MatchError> {
        let start = std::time::Instant::now();
        let guard = self.artifact.load();
        let artifact = guard.as_ref().ok_or(MatchError::NotLoaded)?;

        let mut byte_stream = Vec::with_capacity(ids.len() * 4);
        for id in ids {
            byte_stream.extend_from_slice(&id.to_le_bytes());
        }

        let hits: Vec<policy::RawHit> = artifact
            .automaton
            .find_overlapping_iter(&byte_stream)
            .filter(|m| m.start() % 4 == 0)
            .map(|m| {
                let pattern_index = m.pattern().as_usize();
                let payload = artifact.payloads[pattern_index];
                let end_token = m.end() / 4;
                let start_token = end_token - payload.n as usize;
                policy::RawHit {
                    start: start_token,
                    end: end_token,
                    pattern_index,
                }
            })
            .collect();

        let spans = resolve_spans(&hits, policy, max_spans, &artifact.payloads);

        self.stats.record_match(spans.len() as u64, start.elapsed());
        Ok(spans)
    }

    /// Encodes `tokens` then matches in one call.
    pub fn match_text_tokens(
        &self,
        tokens: &[String],
        policy: MatchPolicy,
        max_spans: usize,
    ) -> Result<Vec<MatchSpan>, MatchError> {
        let ids = self.encode_tokens(tokens)?;
        self.match_ids(&ids, policy, max_spans)
    }
}

fn heap_mb_of(artifact: &LoadedArtifact) -> f64 {
    let automaton_bytes = artifact.automaton.memory_usage();
    let payload_bytes = artifact.payloads.len() * PAYLOAD_RECORD_SIZE;
    let vocab_bytes = artifact.vocab.len() * 32; // rough average token + map overhead
    (automaton_bytes + payload_bytes + vocab_bytes) as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_artifacts;
    use crate::config::BuildConfig;
    use std::io::Cursor;

    fn build_test_artifact(dir: &Path) -> ArtifactPaths {
        let input = [
            r#"{"tokens": ["machine","learning"], "salience": 2.5, "domain_count": 10, "background_count": 2, "phrase_id": 100}"#,
            r#"{"tokens": ["machine","learning","algorithms"], "salience": 5.0, "domain_count": 6, "background_count": 1, "phrase_id": 300}"#,
        ]
        .join("\n");
        let config = BuildConfig {
            version: "v1".into(),
            tokenizer: "whitespace".into(),
            separator_id: 4_294_967_294,
            min_count: None,
            salience_threshold: None,
        };
        let out_dir = dir.join("artifacts");
        build_artifacts(Cursor::new(input.into_bytes()), &config, &out_dir).unwrap();
        ArtifactPaths::in_dir(&out_dir)
    }

    #[test]
    fn match_before_load_fails_not_loaded() {
        let handle = MatcherHandle::new();
        let err = handle
            .match_text_tokens(&["x".to_string()], MatchPolicy::LeftmostLongest, 10)
            .unwrap_err();
        assert!(matches!(err, MatchError::NotLoaded));
    }

    #[test]
    fn s3_leftmost_longest_prefers_longer_span() {
        let dir = tempfile::tempdir().unwrap();
        let paths = build_test_artifact(dir.path());
        let handle = MatcherHandle::new();
        handle.load(&paths).unwrap();

        let tokens = vec![
            "machine".to_string(),
            "learning".to_string(),
            "algorithms".to_string(),
        ];
        let spans = handle
            .match_text_tokens(&tokens, MatchPolicy::LeftmostLongest, 10)
            .unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 3);
        assert_eq!(spans[0].phrase_id, 300);
    }

    #[test]
    fn s4_salience_max_prefers_higher_salience() {
        let dir = tempfile::tempdir().unwrap();
        let paths = build_test_artifact(dir.path());
        let handle = MatcherHandle::new();
        handle.load(&paths).unwrap();

        let tokens = vec![
            "machine".to_string(),
            "learning".to_string(),
            "algorithms".to_string(),
        ];
        let spans = handle
            .match_text_tokens(&tokens, MatchPolicy::SalienceMax, 10)
            .unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].phrase_id, 300);
        assert_eq!(spans[0].salience, 5.0);
    }

    #[test]
    fn s5_unknown_token_gap() {
        let dir = tempfile::tempdir().unwrap();
        let paths = build_test_artifact(dir.path());
        let handle = MatcherHandle::new();
        handle.load(&paths).unwrap();

        let tokens = vec![
            "machine".to_string(),
            "unknown".to_string(),
            "learning".to_string(),
        ];
        let ids = handle.encode_tokens(&tokens).unwrap();
        assert_eq!(ids[1], 0);
        let spans = handle
            .match_text_tokens(&tokens, MatchPolicy::LeftmostLongest, 10)
            .unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn healthcheck_requires_loaded_nonempty_artifact() {
        let handle = MatcherHandle::new();
        assert!(!handle.healthcheck());
        let dir = tempfile::tempdir().unwrap();
        let paths = build_test_artifact(dir.path());
        handle.load(&paths).unwrap();
        assert!(handle.healthcheck());
    }

    #[test]
    fn reload_swaps_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let paths = build_test_artifact(dir.path());
        let handle = MatcherHandle::new();
        handle.load(&paths).unwrap();
        assert_eq!(handle.health().num_patterns, 2);

        // A second build with a single phrase, reloaded into the same handle.
        let dir2 = tempfile::tempdir().unwrap();
        let input = r#"{"tokens": ["single","phrase"], "salience": 1.0, "domain_count": 1, "background_count": 0, "phrase_id": 1}"#;
        let config = BuildConfig {
            version: "v2".into(),
            tokenizer: "whitespace".into(),
            separator_id: 4_294_967_294,
            min_count: None,
            salience_threshold: None,
        };
        let out_dir = dir2.path().join("artifacts2");
        build_artifacts(Cursor::new(input.as_bytes().to_vec()), &config, &out_dir).unwrap();
        handle.load(&ArtifactPaths::in_dir(&out_dir)).unwrap();
        assert_eq!(handle.health().num_patterns, 1);
    }
}

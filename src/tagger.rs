//! Batch tagger: runs a loaded matcher over a corpus of documents and
//! writes `TaggedDocument` lines, accumulating corpus-level counters.

use std::io::{BufRead, Write};

use rayon::prelude::*;

use crate::config::TaggerConfig;
use crate::error::MatchError;
use crate::matcher::{ArtifactPaths, MatcherHandle};
use crate::model::{Document, TaggedDocument, TaggerSpan};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaggerStats {
    pub documents: u64,
    pub total_spans: u64,
    pub docs_with_spans: u64,
}

impl TaggerStats {
    pub fn avg_spans_per_doc(&self) -> f64 {
        if self.documents == 0 {
            0.0
        } else {
            self.total_spans as f64 / self.documents as f64
        }
    }

    pub fn report(&self) {
        tracing::info!(
            documents = self.documents,
            total_spans = self.total_spans,
            docs_with_spans = self.docs_with_spans,
            avg_spans_per_doc = self.avg_spans_per_doc(),
            "tagging complete"
        );
        eprintln!("Documents: {}", self.documents);
        eprintln!("Total spans: {}", self.total_spans);
        eprintln!("Documents with spans: {}", self.docs_with_spans);
        eprintln!("Average spans per document: {:.3}", self.avg_spans_per_doc());
    }
}

/// Loads the artifact set named by `config` into a fresh handle, then
/// streams `input` (line-delimited `Document` JSON), tagging each
/// document and writing `TaggedDocument` lines to `output`.
pub fn tag_corpus<R: BufRead, W: Write>(
    input: R,
    config: &TaggerConfig,
    mut output: W,
) -> Result<TaggerStats, MatchError> {
    let handle = MatcherHandle::new();
    let paths = ArtifactPaths {
        automaton: config.automaton_path.clone(),
        payloads: config.payloads_path.clone(),
        manifest: config.manifest_path.clone(),
        vocab: config.vocab_path.clone(),
    };
    handle.load(&paths)?;

    tag_with_handle(&handle, input, config, &mut output)
}

/// Tags a corpus against an already-loaded handle. Split out from
/// `tag_corpus` so a long-lived service can reuse one hot-reloadable
/// handle across many batch calls instead of reloading per call.
pub fn tag_with_handle<R: BufRead, W: Write>(
    handle: &MatcherHandle,
    input: R,
    config: &TaggerConfig,
    mut output: W,
) -> Result<TaggerStats, MatchError> {
    config.validate()?;

    let mut stats = TaggerStats::default();

    for (line_no, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc: Document = serde_json::from_str(&line)?;
        let doc_id = doc.doc_id.clone().unwrap_or_else(|| (line_no + 1).to_string());

        let match_spans = handle.match_text_tokens(&doc.tokens, config.policy, config.max_spans)?;

        stats.documents += 1;
        stats.total_spans += match_spans.len() as u64;
        if !match_spans.is_empty() {
            stats.docs_with_spans += 1;
        }

        let tagged = TaggedDocument {
            doc_id,
            tokens: doc.tokens,
            spans: match_spans
                .into_iter()
                .map(|s| TaggerSpan {
                    start: s.start,
                    end: s.end,
                    phrase_id: s.phrase_id,
                    label: config.label.clone(),
                })
                .collect(),
        };

        serde_json::to_writer(&mut output, &tagged)?;
        output.write_all(b"\n")?;
    }

    stats.report();
    Ok(stats)
}

fn to_tagged_document(doc_id: String, doc: Document, spans: Vec<crate::model::MatchSpan>, label: &str) -> TaggedDocument {
    TaggedDocument {
        doc_id,
        tokens: doc.tokens,
        spans: spans
            .into_iter()
            .map(|s| TaggerSpan {
                start: s.start,
                end: s.end,
                phrase_id: s.phrase_id,
                label: label.to_string(),
            })
            .collect(),
    }
}

/// Tags an already-resident batch of documents in parallel over `handle`,
/// one `rayon` worker per document. `MatcherHandle` is cheap to clone and
/// read-only after load, so many threads can call `match_text_tokens`
/// concurrently without any contention beyond the matcher's own sampled
/// stats. Indices are collected before parallelizing (the same stable-order
/// idiom used elsewhere in this codebase for `par_iter`) so the returned
/// vector preserves `documents`' input order despite out-of-order
/// completion, unlike `tag_with_handle`'s single-threaded stream.
pub fn tag_batch_parallel(
    handle: &MatcherHandle,
    documents: &[Document],
    config: &TaggerConfig,
) -> Result<(Vec<TaggedDocument>, TaggerStats), MatchError> {
    config.validate()?;

    let tagged: Vec<TaggedDocument> = (0..documents.len())
        .collect::<Vec<_>>()
        .par_iter()
        .map(|&i| -> Result<TaggedDocument, MatchError> {
            let doc = &documents[i];
            let doc_id = doc.doc_id.clone().unwrap_or_else(|| (i + 1).to_string());
            let match_spans = handle.match_text_tokens(&doc.tokens, config.policy, config.max_spans)?;
            Ok(to_tagged_document(doc_id, doc.clone(), match_spans, &config.label))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut stats = TaggerStats::default();
    for doc in &tagged {
        stats.documents += 1;
        stats.total_spans += doc.spans.len() as u64;
        if !doc.spans.is_empty() {
            stats.docs_with_spans += 1;
        }
    }
    stats.report();
    Ok((tagged, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_artifacts;
    use crate::config::{BuildConfig, MatchPolicy};
    use std::io::Cursor;

    fn build_test_artifact(dir: &std::path::Path) -> ArtifactPaths {
        let input = [
            r#"{"tokens": ["machine","learning"], "salience": 2.5, "domain_count": 10, "background_count": 2, "phrase_id": 100}"#,
            r#"{"tokens": ["lysis","buffer"], "salience": 408.33, "domain_count": 2450, "background_count": 5, "phrase_id": 200}"#,
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
    fn s6_tags_a_small_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let paths = build_test_artifact(dir.path());

        let docs = [
            r#"{"doc_id": "d1", "tokens": ["we","used","lysis","buffer","today"]}"#,
            r#"{"doc_id": "d2", "tokens": ["no","phrases","here"]}"#,
        ]
        .join("\n");

        let config = TaggerConfig {
            automaton_path: paths.automaton,
            payloads_path: paths.payloads,
            manifest_path: paths.manifest,
            vocab_path: paths.vocab,
            policy: MatchPolicy::LeftmostLongest,
            max_spans: 64,
            label: "PHRASE".to_string(),
        };

        let mut out = Vec::new();
        let stats = tag_corpus(Cursor::new(docs.into_bytes()), &config, &mut out).unwrap();
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.docs_with_spans, 1);
        assert_eq!(stats.total_spans, 1);

        let tagged: Vec<TaggedDocument> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(tagged[0].doc_id, "d1");
        assert_eq!(tagged[0].spans.len(), 1);
        assert_eq!(tagged[0].spans[0].phrase_id, 200);
        assert_eq!(tagged[0].spans[0].label, "PHRASE");
        assert!(tagged[1].spans.is_empty());
    }

    #[test]
    fn s6_tagger_end_to_end_aggregate_stats() {
        let dir = tempfile::tempdir().unwrap();
        let paths = build_test_artifact(dir.path());

        let docs = [
            r#"{"doc_id": "d1", "tokens": ["no","phrases","here"]}"#,
            r#"{"doc_id": "d2", "tokens": ["we","used","lysis","buffer","today"]}"#,
            r#"{"doc_id": "d3", "tokens": ["lysis","buffer","then","lysis","buffer"]}"#,
        ]
        .join("\n");

        let config = TaggerConfig {
            automaton_path: paths.automaton,
            payloads_path: paths.payloads,
            manifest_path: paths.manifest,
            vocab_path: paths.vocab,
            policy: MatchPolicy::LeftmostLongest,
            max_spans: 64,
            label: "PHRASE".to_string(),
        };

        let mut out = Vec::new();
        let stats = tag_corpus(Cursor::new(docs.into_bytes()), &config, &mut out).unwrap();
        assert_eq!(stats.documents, 3);
        assert_eq!(stats.docs_with_spans, 2);
        assert_eq!(stats.total_spans, 3);
        assert!((stats.avg_spans_per_doc() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn avg_spans_per_doc_is_zero_when_no_documents() {
        let stats = TaggerStats::default();
        assert_eq!(stats.avg_spans_per_doc(), 0.0);
    }

    #[test]
    fn tag_batch_parallel_preserves_input_order_and_matches_serial_stats() {
        let dir = tempfile::tempdir().unwrap();
        let paths = build_test_artifact(dir.path());
        let handle = MatcherHandle::new();
        handle.load(&paths).unwrap();

        let documents: Vec<Document> = (0..20)
            .map(|i| Document {
                tokens: if i % 2 == 0 {
                    vec!["we".into(), "used".into(), "lysis".into(), "buffer".into()]
                } else {
                    vec!["no".into(), "phrases".into(), "here".into()]
                },
                doc_id: Some(format!("d{i}")),
            })
            .collect();

        let config = TaggerConfig {
            automaton_path: paths.automaton,
            payloads_path: paths.payloads,
            manifest_path: paths.manifest,
            vocab_path: paths.vocab,
            policy: MatchPolicy::LeftmostLongest,
            max_spans: 64,
            label: "PHRASE".to_string(),
        };

        let (tagged, stats) = tag_batch_parallel(&handle, &documents, &config).unwrap();
        assert_eq!(tagged.len(), 20);
        for (i, doc) in tagged.iter().enumerate() {
            assert_eq!(doc.doc_id, format!("d{i}"));
        }
        assert_eq!(stats.documents, 20);
        assert_eq!(stats.docs_with_spans, 10);
        assert_eq!(stats.total_spans, 10);
    }
}

//! End-to-end pipeline test: mine -> score -> build -> tag, exercising
//! every stage's public contract the way the four CLI binaries compose
//! them.

use std::io::Cursor;

use phrasefind::builder::build_artifacts;
use phrasefind::config::{BuildConfig, MatchPolicy, MiningConfig, ScoreMethod, ScoringConfig, TaggerConfig};
use phrasefind::matcher::ArtifactPaths;
use phrasefind::miner::mine_corpus;
use phrasefind::scorer::score_phrases;
use phrasefind::tagger::tag_corpus;

fn domain_docs() -> String {
    [
        r#"{"tokens": ["rat","cdk10","oligo"]}"#,
        r#"{"tokens": ["rat","cdk10","protein"]}"#,
        r#"{"tokens": ["rat","cdk10"]}"#,
        r#"{"tokens": ["lysis","buffer","added"]}"#,
        r#"{"tokens": ["lysis","buffer","removed"]}"#,
    ]
    .join("\n")
}

fn background_docs() -> String {
    [
        r#"{"tokens": ["for","the","record"]}"#,
        r#"{"tokens": ["lysis","buffer"]}"#,
    ]
    .join("\n")
}

#[test]
fn full_pipeline_mines_scores_builds_and_tags() {
    let mining_config = MiningConfig {
        min_n: 2,
        max_n: 2,
        min_count: 2,
    };

    let mut domain_candidates = Vec::new();
    mine_corpus(Cursor::new(domain_docs().into_bytes()), &mining_config, &mut domain_candidates).unwrap();

    let mut background_candidates = Vec::new();
    mine_corpus(
        Cursor::new(background_docs().into_bytes()),
        &mining_config,
        &mut background_candidates,
    )
    .unwrap();

    let scoring_config = ScoringConfig {
        method: ScoreMethod::Ratio,
        min_salience: 1.0,
        min_domain_count: 2,
        assign_phrase_ids: true,
        starting_phrase_id: 1,
    };

    let mut scored = Vec::new();
    score_phrases(
        Cursor::new(domain_candidates),
        Cursor::new(background_candidates),
        &scoring_config,
        &mut scored,
    )
    .unwrap();
    assert!(!scored.is_empty(), "expected at least one surviving phrase");

    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("artifacts");
    let build_config = BuildConfig {
        version: "v1".to_string(),
        tokenizer: "whitespace".to_string(),
        separator_id: 4_294_967_294,
        min_count: Some(2),
        salience_threshold: None,
    };
    let num_patterns = build_artifacts(Cursor::new(scored), &build_config, &out_dir).unwrap();
    assert!(num_patterns > 0);

    let paths = ArtifactPaths::in_dir(&out_dir);
    let tagger_config = TaggerConfig {
        automaton_path: paths.automaton,
        payloads_path: paths.payloads,
        manifest_path: paths.manifest,
        vocab_path: paths.vocab,
        policy: MatchPolicy::LeftmostLongest,
        max_spans: 16,
        label: "PHRASE".to_string(),
    };

    let corpus = [r#"{"doc_id": "x1", "tokens": ["rat","cdk10","is","interesting"]}"#].join("\n");
    let mut tagged_out = Vec::new();
    let stats = tag_corpus(Cursor::new(corpus.into_bytes()), &tagger_config, &mut tagged_out).unwrap();
    assert_eq!(stats.documents, 1);
    assert_eq!(stats.docs_with_spans, 1);

    let tagged_text = String::from_utf8(tagged_out).unwrap();
    assert!(tagged_text.contains("\"phrase_id\""));
}

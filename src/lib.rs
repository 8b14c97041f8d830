//! # phrasefind
//!
//! A weak-supervision phrase mining and matching toolkit: four stages
//! (mine, score, build, tag) that turn a raw token corpus into a
//! reloadable phrase-tagging artifact set.
//!
//! Each stage is exposed both as a library function and as a standalone
//! binary so they can be composed in a pipeline or called individually
//! from Rust. See `SPEC_FULL.md` for the wire contract between stages.

pub mod automaton;
pub mod builder;
pub mod config;
pub mod error;
pub mod matcher;
pub mod miner;
pub mod model;
pub mod scorer;
pub mod tagger;
pub mod vocab;

pub use builder::build_artifacts;
pub use error::{BuildError, MatchError, MinerError, ScorerError};
pub use matcher::{ArtifactPaths, MatcherHandle, MatcherHealth};
pub use miner::mine_corpus;
pub use scorer::score_phrases;
pub use tagger::{tag_corpus, TaggerStats};

//! Overlap resolution policies, modeled as the cluster-local selection
//! rule modeled as a graph: hits are nodes, overlap is an edge, and
//! each policy is a reducer over connected clusters (or, for the two
//! leftmost policies, a left-to-right greedy walk — which is itself a
//! special case of the same cluster reduction).

use crate::config::MatchPolicy;
use crate::model::{MatchSpan, PayloadRecord};

/// A raw automaton hit before any payload lookup beyond `n` has happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHit {
    pub start: usize,
    pub end: usize,
    pub pattern_index: usize,
}

fn to_span(hit: RawHit, payloads: &[PayloadRecord]) -> MatchSpan {
    let payload = payloads[hit.pattern_index];
    MatchSpan {
        start: hit.start,
        end: hit.end,
        phrase_id: payload.phrase_id,
        salience: payload.salience,
        count: payload.count,
        n: payload.n,
    }
}

/// Greedy left-to-right walk shared by `leftmost_longest` and
/// `leftmost_first`: iterate candidates by ascending start, break ties
/// per `prefer_longest`, and advance a cursor past each chosen hit so
/// later candidates starting before the cursor are skipped.
fn resolve_leftmost(hits: &[RawHit], prefer_longest: bool) -> Vec<RawHit> {
    let mut sorted = hits.to_vec();
    sorted.sort_by(|a, b| {
        a.start.cmp(&b.start).then_with(|| {
            if prefer_longest {
                b.end.cmp(&a.end)
            } else {
                a.pattern_index.cmp(&b.pattern_index)
            }
        })
    });

    let mut result = Vec::new();
    let mut cursor = 0usize;
    for hit in sorted {
        if hit.start < cursor {
            continue;
        }
        cursor = hit.end;
        result.push(hit);
    }
    result
}

/// Groups hits into clusters of mutually-reachable overlap (hit A and B
/// are in the same cluster if some chain of pairwise-overlapping hits
/// connects them, even if A and B themselves don't directly overlap).
fn build_clusters(hits: &[RawHit]) -> Vec<Vec<RawHit>> {
    let mut sorted = hits.to_vec();
    sorted.sort_by_key(|h| h.start);

    let mut clusters: Vec<Vec<RawHit>> = Vec::new();
    let mut current: Vec<RawHit> = Vec::new();
    let mut current_max_end = 0usize;

    for hit in sorted {
        if current.is_empty() || hit.start < current_max_end {
            current_max_end = current_max_end.max(hit.end);
            current.push(hit);
        } else {
            clusters.push(std::mem::take(&mut current));
            current_max_end = hit.end;
            current.push(hit);
        }
    }
    if !current.is_empty() {
        clusters.push(current);
    }
    clusters
}

/// Within each cluster, repeatedly picks the highest-salience hit (ties
/// broken by longer span, then smaller pattern_index), removes it and
/// anything it overlaps, and repeats on what remains.
fn resolve_salience_max(hits: &[RawHit], payloads: &[PayloadRecord]) -> Vec<RawHit> {
    let mut result = Vec::new();
    for cluster in build_clusters(hits) {
        let mut remaining = cluster;
        while !remaining.is_empty() {
            let best_idx = remaining
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    let pa = payloads[a.pattern_index];
                    let pb = payloads[b.pattern_index];
                    pa.salience
                        .partial_cmp(&pb.salience)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| (a.end - a.start).cmp(&(b.end - b.start)))
                        .then_with(|| b.pattern_index.cmp(&a.pattern_index))
                })
                .map(|(idx, _)| idx)
                .expect("remaining is non-empty");

            let best = remaining[best_idx];
            result.push(best);
            remaining.retain(|h| h.end <= best.start || h.start >= best.end);
        }
    }
    result.sort_by_key(|h| h.start);
    result
}

/// Resolves raw automaton hits into the output span set per `policy`,
/// truncating at `max_spans`. The `all` policy bypasses resolution
/// entirely and reports every hit in automaton hit order.
pub fn resolve_spans(
    hits: &[RawHit],
    policy: MatchPolicy,
    max_spans: usize,
    payloads: &[PayloadRecord],
) -> Vec<MatchSpan> {
    let resolved = match policy {
        MatchPolicy::LeftmostLongest => resolve_leftmost(hits, true),
        MatchPolicy::LeftmostFirst => resolve_leftmost(hits, false),
        MatchPolicy::SalienceMax => resolve_salience_max(hits, payloads),
        MatchPolicy::All => hits.to_vec(),
    };

    resolved
        .into_iter()
        .take(max_spans)
        .map(|hit| to_span(hit, payloads))
        .collect()
}

//! Matcher runtime stats: a hit counter plus a small sampled latency
//! reservoir, read by the healthcheck surface.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Reservoir size for latency sampling. Calls beyond this count per
/// window overwrite the oldest sample round-robin, trading precision
/// for a bounded footprint under sustained load.
const RESERVOIR_CAPACITY: usize = 512;

/// Only one call in this many has its latency sampled into the
/// reservoir at all, keeping the sampled fraction sub-percent so the
/// hot `match_ids` path pays for an atomic store, not a lock, on the
/// overwhelming majority of calls.
const SAMPLE_EVERY: u64 = 128;

pub struct MatcherStats {
    hits_total: AtomicU64,
    calls_total: AtomicU64,
    samples: Vec<AtomicU64>,
    samples_recorded: AtomicU64,
}

impl MatcherStats {
    pub fn new() -> Self {
        let mut samples = Vec::with_capacity(RESERVOIR_CAPACITY);
        samples.resize_with(RESERVOIR_CAPACITY, || AtomicU64::new(0));
        MatcherStats {
            hits_total: AtomicU64::new(0),
            calls_total: AtomicU64::new(0),
            samples,
            samples_recorded: AtomicU64::new(0),
        }
    }

    /// Records one `match_ids` call: `count` spans returned, `elapsed`
    /// wall-clock time spent resolving them. Only every `SAMPLE_EVERY`th
    /// call touches the latency reservoir; the rest just bump the
    /// atomic counters.
    pub fn record_match(&self, count: u64, elapsed: Duration) {
        self.hits_total.fetch_add(count, Ordering::Relaxed);
        let calls = self.calls_total.fetch_add(1, Ordering::Relaxed) + 1;

        if calls % SAMPLE_EVERY != 0 {
            return;
        }

        let micros = elapsed.as_secs_f64() * 1_000_000.0;
        let slot = (self.samples_recorded.fetch_add(1, Ordering::Relaxed) as usize) % RESERVOIR_CAPACITY;
        self.samples[slot].store(micros.to_bits(), Ordering::Relaxed);
    }

    pub fn hits_total(&self) -> u64 {
        self.hits_total.load(Ordering::Relaxed)
    }

    pub fn calls_total(&self) -> u64 {
        self.calls_total.load(Ordering::Relaxed)
    }

    /// Returns (p50, p95, p99) latency in microseconds over the current
    /// reservoir. All zero when no calls have been sampled yet.
    pub fn percentiles_us(&self) -> (f64, f64, f64) {
        let recorded = self.samples_recorded.load(Ordering::Relaxed);
        if recorded == 0 {
            return (0.0, 0.0, 0.0);
        }
        let valid = recorded.min(RESERVOIR_CAPACITY as u64) as usize;
        let mut sorted: Vec<f64> = self.samples[..valid]
            .iter()
            .map(|slot| f64::from_bits(slot.load(Ordering::Relaxed)))
            .collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let pick = |p: f64| -> f64 {
            let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };
        (pick(0.50), pick(0.95), pick(0.99))
    }
}

impl Default for MatcherStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let stats = MatcherStats::new();
        assert_eq!(stats.hits_total(), 0);
        assert_eq!(stats.calls_total(), 0);
        assert_eq!(stats.percentiles_us(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn accumulates_hits_and_calls() {
        let stats = MatcherStats::new();
        stats.record_match(3, Duration::from_micros(100));
        stats.record_match(2, Duration::from_micros(200));
        assert_eq!(stats.hits_total(), 5);
        assert_eq!(stats.calls_total(), 2);
    }

    #[test]
    fn only_sub_percent_of_calls_are_sampled() {
        let stats = MatcherStats::new();
        for _ in 0..(SAMPLE_EVERY * 10) {
            stats.record_match(1, Duration::from_micros(1));
        }
        assert_eq!(stats.calls_total(), SAMPLE_EVERY * 10);
        assert_eq!(stats.samples_recorded.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn percentiles_track_inserted_samples() {
        let stats = MatcherStats::new();
        // Only the SAMPLE_EVERY-th call lands in the reservoir, so park the
        // value we want recorded (1..=100) on exactly those calls and let
        // the rest carry a throwaway latency.
        for call_num in 1..=(SAMPLE_EVERY * 100) {
            let us = (call_num / SAMPLE_EVERY).max(1);
            stats.record_match(1, Duration::from_micros(us));
        }
        let (p50, p95, p99) = stats.percentiles_us();
        assert!((49.0..=51.0).contains(&p50));
        assert!((94.0..=96.0).contains(&p95));
        assert!((98.0..=100.0).contains(&p99));
    }

    #[test]
    fn reservoir_does_not_grow_unbounded() {
        let stats = MatcherStats::new();
        for us in 0..(RESERVOIR_CAPACITY as u64 * SAMPLE_EVERY * 3) {
            stats.record_match(1, Duration::from_micros(us));
        }
        assert_eq!(stats.samples.len(), RESERVOIR_CAPACITY);
        let recorded = stats.samples_recorded.load(Ordering::Relaxed);
        assert!(recorded as usize >= RESERVOIR_CAPACITY);
        let (p50, _, p99) = stats.percentiles_us();
        assert!(p50 > 0.0 && p99 >= p50);
    }
}

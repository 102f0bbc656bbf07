/// Replay statistics
///
/// Counts records and book outcomes, and keeps rolling windows of decode and
/// apply latency in microseconds.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::info;

const WINDOW_SIZE: usize = 10000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub min_us: u64,
    pub max_us: u64,
    pub mean_us: f64,
    pub p50_us: u64,
    pub p99_us: u64,
}

impl LatencyStats {
    fn from_window(window: &VecDeque<u64>) -> Option<Self> {
        if window.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = window.iter().copied().collect();
        sorted.sort_unstable();

        let len = sorted.len();
        Some(LatencyStats {
            min_us: sorted[0],
            max_us: sorted[len - 1],
            mean_us: sorted.iter().sum::<u64>() as f64 / len as f64,
            p50_us: sorted[len / 2],
            p99_us: sorted[(len * 99) / 100],
        })
    }
}

fn push_window(window: &mut VecDeque<u64>, micros: u64) {
    if window.len() >= WINDOW_SIZE {
        window.pop_front();
    }
    window.push_back(micros);
}

#[derive(Debug, Clone)]
pub struct FeedStats {
    start_time: Option<Instant>,
    total_records: u64,
    total_bytes: u64,
    decode_failures: u64,

    applied: u64,
    skipped: u64,
    gap_events: u64,

    decode_latencies: VecDeque<u64>,
    apply_latencies: VecDeque<u64>,
}

impl FeedStats {
    pub fn new() -> Self {
        FeedStats {
            start_time: None,
            total_records: 0,
            total_bytes: 0,
            decode_failures: 0,
            applied: 0,
            skipped: 0,
            gap_events: 0,
            decode_latencies: VecDeque::with_capacity(WINDOW_SIZE),
            apply_latencies: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    /// Record a raw record received
    pub fn record_input(&mut self, size: usize) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.total_records += 1;
        self.total_bytes += size as u64;
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures += 1;
    }

    pub fn record_applied(&mut self) {
        self.applied += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_gap(&mut self) {
        self.gap_events += 1;
    }

    pub fn record_decode_latency(&mut self, micros: u64) {
        push_window(&mut self.decode_latencies, micros);
    }

    /// Time to route one update through every live book
    pub fn record_apply_latency(&mut self, micros: u64) {
        push_window(&mut self.apply_latencies, micros);
    }

    pub fn records_per_sec(&self) -> f64 {
        match self.start_time {
            None => 0.0,
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    self.total_records as f64 / elapsed
                } else {
                    0.0
                }
            }
        }
    }

    pub fn decode_latency_stats(&self) -> Option<LatencyStats> {
        LatencyStats::from_window(&self.decode_latencies)
    }

    pub fn apply_latency_stats(&self) -> Option<LatencyStats> {
        LatencyStats::from_window(&self.apply_latencies)
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.start_time.map(|st| st.elapsed())
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn gap_events(&self) -> u64 {
        self.gap_events
    }

    pub fn reset(&mut self) {
        *self = FeedStats::new();
    }

    pub fn log_summary(&self) {
        info!(
            records = self.total_records,
            bytes = self.total_bytes,
            decode_failures = self.decode_failures,
            applied = self.applied,
            skipped = self.skipped,
            gaps = self.gap_events,
            records_per_sec = self.records_per_sec(),
            "replay statistics"
        );

        if let Some(stats) = self.decode_latency_stats() {
            info!(
                min_us = stats.min_us,
                max_us = stats.max_us,
                mean_us = stats.mean_us,
                p50_us = stats.p50_us,
                p99_us = stats.p99_us,
                "decode latency"
            );
        }

        if let Some(stats) = self.apply_latency_stats() {
            info!(
                min_us = stats.min_us,
                max_us = stats.max_us,
                mean_us = stats.mean_us,
                p50_us = stats.p50_us,
                p99_us = stats.p99_us,
                "apply latency"
            );
        }
    }
}

impl Default for FeedStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_input() {
        let mut stats = FeedStats::new();
        stats.record_input(46);
        assert_eq!(stats.total_records(), 1);
        assert_eq!(stats.total_bytes(), 46);
    }

    #[test]
    fn test_decode_latency_stats() {
        let mut stats = FeedStats::new();
        for i in 1..=100 {
            stats.record_decode_latency(i);
        }

        let latency = stats.decode_latency_stats().unwrap();
        assert_eq!(latency.min_us, 1);
        assert_eq!(latency.max_us, 100);
        assert_eq!(latency.p50_us, 51);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut stats = FeedStats::new();
        for i in 0..(WINDOW_SIZE as u64 + 5) {
            stats.record_apply_latency(i);
        }
        assert_eq!(stats.apply_latency_stats().unwrap().min_us, 5);
    }

    #[test]
    fn test_outcome_counters() {
        let mut stats = FeedStats::new();
        stats.record_applied();
        stats.record_applied();
        stats.record_skipped();
        stats.record_gap();
        stats.record_decode_failure();
        assert_eq!(stats.applied(), 2);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(stats.gap_events(), 1);
        assert_eq!(stats.decode_failures(), 1);

        stats.reset();
        assert_eq!(stats.applied(), 0);
    }
}

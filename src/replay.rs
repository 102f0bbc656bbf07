/// Batch replay of captured depth data
///
/// Snapshot records seed one book each, keyed by the epoch in their archive
/// member name. Diff records are then decoded line by line and routed to
/// every live book; applied diffs are sampled by a `DepthRecorder`.
/// Malformed diff records are logged, counted and dropped.

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ConfigError, ReplayConfig};
use crate::decoder::{DecodeError, Decoder};
use crate::gap_detector::SequenceGap;
use crate::protocol::PartialUpdate;
use crate::recorder::DepthRecorder;
use crate::registry::{BookRegistry, RouteReport};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("not a snapshot member: {member}")]
    UnrecognizedSnapshot { member: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Parse the epoch out of `[./]<prefix>.<epoch>`
pub fn snapshot_epoch(member_name: &str, prefix: &str) -> Option<i64> {
    let name = member_name.strip_prefix("./").unwrap_or(member_name);
    name.strip_prefix(prefix)?
        .strip_prefix('.')?
        .parse()
        .ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub records: u64,
    pub decode_failures: u64,
    pub applied: u64,
    pub skipped: u64,
    pub retired: Vec<SequenceGap>,
    pub live_books: usize,
}

#[derive(Debug)]
pub struct Replay {
    config: ReplayConfig,
    registry: BookRegistry,
    recorder: DepthRecorder,
}

impl Replay {
    pub fn new(config: ReplayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let recorder = DepthRecorder::new(config.depth, config.log_every);
        Ok(Replay {
            config,
            registry: BookRegistry::new(),
            recorder,
        })
    }

    pub fn is_snapshot_member(&self, member_name: &str) -> bool {
        snapshot_epoch(member_name, &self.config.snapshot_prefix).is_some()
    }

    pub fn is_depth_stream(&self, member_name: &str) -> bool {
        member_name.strip_prefix("./").unwrap_or(member_name) == self.config.depth_stream
    }

    /// Decode a snapshot record and start a book for its epoch
    pub fn add_snapshot_record(&mut self, member_name: &str, text: &str) -> Result<i64, ReplayError> {
        let epoch = snapshot_epoch(member_name, &self.config.snapshot_prefix).ok_or_else(|| {
            ReplayError::UnrecognizedSnapshot {
                member: member_name.to_string(),
            }
        })?;
        let snapshot = Decoder::decode_snapshot_line(text.trim_end())?;
        debug!(epoch, last_update_id = snapshot.last_update_id, "loaded snapshot");
        self.registry.insert(epoch, &snapshot);
        Ok(epoch)
    }

    /// Decode one diff record line and route it
    pub fn feed_update_line(&mut self, line: &str) -> Result<RouteReport, DecodeError> {
        self.registry.stats_mut().record_input(line.len());

        let start = Instant::now();
        let decoded = Decoder::decode_update_line(line);
        self.registry
            .stats_mut()
            .record_decode_latency(start.elapsed().as_micros() as u64);

        match decoded {
            Ok(update) => Ok(self.feed_update(&update)),
            Err(e) => {
                warn!(error = %e, "dropping malformed depth record");
                self.registry.stats_mut().record_decode_failure();
                Err(e)
            }
        }
    }

    /// Feed every non-empty line; malformed ones are skipped
    /// Returns the number of lines that decoded.
    pub fn feed_lines(&mut self, text: &str) -> usize {
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .filter(|l| self.feed_update_line(l).is_ok())
            .count()
    }

    pub fn feed_update(&mut self, update: &PartialUpdate) -> RouteReport {
        if self.config.parallel {
            self.registry.route_parallel(update, &mut self.recorder)
        } else {
            self.registry.route(update, &mut self.recorder)
        }
    }

    pub fn registry(&self) -> &BookRegistry {
        &self.registry
    }

    pub fn recorder(&self) -> &DepthRecorder {
        &self.recorder
    }

    pub fn finish(self) -> (DepthRecorder, ReplaySummary) {
        let stats = self.registry.stats();
        stats.log_summary();
        let summary = ReplaySummary {
            records: stats.total_records(),
            decode_failures: stats.decode_failures(),
            applied: stats.applied(),
            skipped: stats.skipped(),
            retired: self.registry.gaps().gaps().to_vec(),
            live_books: self.registry.len(),
        };
        (self.recorder, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_epoch() {
        let prefix = "binance.BTCUSDT@orderbook5000";
        assert_eq!(
            snapshot_epoch("./binance.BTCUSDT@orderbook5000.1700000000", prefix),
            Some(1_700_000_000)
        );
        assert_eq!(snapshot_epoch("binance.BTCUSDT@orderbook5000.42", prefix), Some(42));
        assert_eq!(snapshot_epoch("./btcusdt@depth@100ms", prefix), None);
        assert_eq!(snapshot_epoch("./binance.BTCUSDT@orderbook5000", prefix), None);
        assert_eq!(snapshot_epoch("./binance.BTCUSDT@orderbook5000.x1", prefix), None);
    }

    #[test]
    fn test_member_filters() {
        let replay = Replay::new(ReplayConfig::default()).unwrap();
        assert!(replay.is_depth_stream("./btcusdt@depth@100ms"));
        assert!(!replay.is_depth_stream("./btcusdt@depth"));
        assert!(replay.is_snapshot_member("./binance.BTCUSDT@orderbook5000.7"));
    }

    #[test]
    fn test_rejects_unknown_snapshot_member() {
        let mut replay = Replay::new(ReplayConfig::default()).unwrap();
        let result = replay.add_snapshot_record("./other.1", "1|{}");
        assert!(matches!(result, Err(ReplayError::UnrecognizedSnapshot { .. })));
    }
}

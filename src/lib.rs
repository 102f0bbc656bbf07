/// Depth Sync - Order Book Reconciliation from Snapshot + Diff Feeds
///
/// Rebuilds limit order books from a full depth snapshot plus a stream of
/// incremental diffs keyed by update-id ranges. Features include:
/// - Price-level sides with deletion-aware merge and ranked queries
/// - Dual-shape level decoding behind a single validation boundary
/// - Stale / contiguous / gap classification of every diff
/// - Many books (one per snapshot epoch) advanced side by side, optionally in parallel
/// - Fixed-depth top-of-book recording and replay statistics

pub mod levels;
pub mod protocol;
pub mod decoder;
pub mod gap_detector;
pub mod book_builder;
pub mod registry;
pub mod recorder;
pub mod config;
pub mod replay;
pub mod stats;

pub use levels::{Levels, LevelSlice, LevelError, PriceLevel};
pub use protocol::{Snapshot, PartialUpdate, RawLevel, RawNumber};
pub use decoder::{Decoder, DecodeError, DecodeResult};
pub use gap_detector::{classify, GapDetector, SequenceGap, Sequencing};
pub use book_builder::{OrderBook, ApplyOutcome, BookDepth};
pub use registry::{BookRegistry, BookObserver, RouteReport};
pub use recorder::{DepthRecorder, DepthSeries};
pub use config::{ReplayConfig, ConfigError};
pub use replay::{Replay, ReplayError, ReplaySummary};
pub use stats::{FeedStats, LatencyStats};

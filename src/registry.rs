/// Registry of order books, one per snapshot epoch
///
/// Every diff is routed to every live book. Books that report a gap are
/// retired once the sweep finishes; the rest keep going independently.

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::warn;

use crate::book_builder::{ApplyOutcome, OrderBook};
use crate::gap_detector::{GapDetector, SequenceGap};
use crate::protocol::{PartialUpdate, Snapshot};
use crate::stats::FeedStats;

/// Receives a book each time a diff is applied to it
pub trait BookObserver {
    fn on_book_update(&mut self, book: &OrderBook);
}

impl<F> BookObserver for F
where
    F: FnMut(&OrderBook),
{
    fn on_book_update(&mut self, book: &OrderBook) {
        self(book)
    }
}

/// What one routed update did across the registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteReport {
    pub applied: usize,
    pub skipped: usize,
    pub retired: Vec<SequenceGap>,
}

#[derive(Debug, Default)]
pub struct BookRegistry {
    books: BTreeMap<i64, OrderBook>,
    gaps: GapDetector,
    stats: FeedStats,
}

impl BookRegistry {
    pub fn new() -> Self {
        BookRegistry {
            books: BTreeMap::new(),
            gaps: GapDetector::new(),
            stats: FeedStats::new(),
        }
    }

    /// Start (or restart) the book for `epoch` from a snapshot
    pub fn insert(&mut self, epoch: i64, snapshot: &Snapshot) {
        self.books.insert(epoch, OrderBook::from_snapshot(epoch, snapshot));
    }

    /// Apply `update` to every live book in epoch order
    pub fn route<O: BookObserver>(&mut self, update: &PartialUpdate, observer: &mut O) -> RouteReport {
        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(self.books.len());
        for (&epoch, book) in self.books.iter_mut() {
            let outcome = book.apply(update);
            if matches!(outcome, Ok(ApplyOutcome::Applied)) {
                observer.on_book_update(book);
            }
            outcomes.push((epoch, outcome));
        }
        self.settle(outcomes, start)
    }

    /// Like `route`, but books are advanced concurrently
    /// The observer still sees books one at a time, in epoch order.
    pub fn route_parallel<O: BookObserver>(
        &mut self,
        update: &PartialUpdate,
        observer: &mut O,
    ) -> RouteReport {
        let start = Instant::now();
        let outcomes: Vec<(i64, Result<ApplyOutcome, SequenceGap>)> = self
            .books
            .par_iter_mut()
            .map(|(&epoch, book)| (epoch, book.apply(update)))
            .collect();

        let books = &self.books;
        for (epoch, outcome) in &outcomes {
            if matches!(outcome, Ok(ApplyOutcome::Applied)) {
                if let Some(book) = books.get(epoch) {
                    observer.on_book_update(book);
                }
            }
        }
        self.settle(outcomes, start)
    }

    fn settle(
        &mut self,
        outcomes: Vec<(i64, Result<ApplyOutcome, SequenceGap>)>,
        start: Instant,
    ) -> RouteReport {
        let mut report = RouteReport::default();
        for (epoch, outcome) in outcomes {
            match outcome {
                Ok(ApplyOutcome::Applied) => {
                    report.applied += 1;
                    self.stats.record_applied();
                }
                Ok(ApplyOutcome::Skipped) => {
                    report.skipped += 1;
                    self.stats.record_skipped();
                }
                Err(gap) => {
                    warn!(
                        book_id = epoch,
                        expected = gap.expected,
                        received = gap.received,
                        "retiring order book after sequence gap"
                    );
                    self.books.remove(&epoch);
                    self.gaps.record(gap);
                    self.stats.record_gap();
                    report.retired.push(gap);
                }
            }
        }
        self.stats
            .record_apply_latency(start.elapsed().as_micros() as u64);
        report
    }

    pub fn get(&self, epoch: i64) -> Option<&OrderBook> {
        self.books.get(&epoch)
    }

    /// Epochs of live books, ascending
    pub fn live(&self) -> impl Iterator<Item = i64> + '_ {
        self.books.keys().copied()
    }

    pub fn books(&self) -> impl Iterator<Item = &OrderBook> + '_ {
        self.books.values()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn gaps(&self) -> &GapDetector {
        &self.gaps
    }

    pub fn stats(&self) -> &FeedStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut FeedStats {
        &mut self.stats
    }
}

/// Order book reconciled from a snapshot plus diffs
///
/// A book starts at its snapshot's `last_update_id` and only moves forward
/// through `apply`. Stale diffs are skipped; a diff that would skip update
/// ids returns a `SequenceGap` and leaves the book untouched. The book never
/// heals itself; its owner retires it.

use tracing::{debug, trace};

use crate::gap_detector::{classify, SequenceGap, Sequencing};
use crate::levels::{LevelError, LevelSlice, Levels, PriceLevel};
use crate::protocol::{PartialUpdate, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct OrderBook {
    id: i64,
    bids: Levels,
    asks: Levels,
    last_update_id: i64,
}

impl OrderBook {
    /// Build a book from a snapshot; `id` names it in gap reports
    pub fn from_snapshot(id: i64, snapshot: &Snapshot) -> Self {
        let mut bids = Levels::new();
        let mut asks = Levels::new();
        bids.merge(&snapshot.bids);
        asks.merge(&snapshot.asks);

        debug!(
            book_id = id,
            last_update_id = snapshot.last_update_id,
            bids = bids.len(),
            asks = asks.len(),
            "order book built from snapshot"
        );

        OrderBook {
            id,
            bids,
            asks,
            last_update_id: snapshot.last_update_id,
        }
    }

    /// Advance the book by one diff
    pub fn apply(&mut self, update: &PartialUpdate) -> Result<ApplyOutcome, SequenceGap> {
        match classify(self.last_update_id, update.first_update_id, update.last_update_id) {
            Sequencing::Stale => {
                trace!(
                    book_id = self.id,
                    last_update_id = self.last_update_id,
                    update_last = update.last_update_id,
                    "skipping stale update"
                );
                Ok(ApplyOutcome::Skipped)
            }
            Sequencing::Gap { expected, received } => Err(SequenceGap {
                book_id: self.id,
                expected,
                received,
            }),
            Sequencing::Contiguous => {
                self.bids.merge(&update.bids);
                self.asks.merge(&update.asks);
                self.last_update_id = update.last_update_id;
                trace!(
                    book_id = self.id,
                    last_update_id = self.last_update_id,
                    bid_changes = update.bids.len(),
                    ask_changes = update.asks.len(),
                    "applied update"
                );
                Ok(ApplyOutcome::Applied)
            }
        }
    }

    /// The i-th best bid, 1 = highest
    pub fn best_bid(&self, rank: usize) -> Result<PriceLevel, LevelError> {
        self.bids.nth_from_top(rank)
    }

    /// The i-th best ask, 1 = lowest
    pub fn best_ask(&self, rank: usize) -> Result<PriceLevel, LevelError> {
        self.asks.nth_from_bottom(rank)
    }

    /// Up to `n` bids, highest first
    pub fn best_bids(&self, n: usize) -> LevelSlice<'_> {
        self.bids.top_slice(n, true)
    }

    /// Up to `n` asks, lowest first
    pub fn best_asks(&self, n: usize) -> LevelSlice<'_> {
        self.asks.bottom_slice(n, true)
    }

    /// Best ask minus best bid; None if either side is empty or the book is crossed
    pub fn spread(&self) -> Option<f64> {
        let bid = self.best_bid(1).ok()?;
        let ask = self.best_ask(1).ok()?;
        if bid.price < ask.price {
            Some(ask.price - bid.price)
        } else {
            None
        }
    }

    /// Top `n` levels of each side
    pub fn depth(&self, n: usize) -> BookDepth {
        BookDepth {
            bids: self.best_bids(n).collect(),
            asks: self.best_asks(n).collect(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn last_update_id(&self) -> i64 {
        self.last_update_id
    }

    pub fn bids(&self) -> &Levels {
        &self.bids
    }

    pub fn asks(&self) -> &Levels {
        &self.asks
    }

    /// Resident levels on both sides
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookDepth {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

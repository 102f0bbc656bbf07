/// Top-of-book time series
///
/// After every applied diff the recorder pulls a fixed-depth slice of each
/// side and appends one row per field. Rows can hold fewer than `depth`
/// levels when a side is thin.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::book_builder::OrderBook;
use crate::registry::BookObserver;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepthSeries {
    pub bid_prices: Vec<Vec<f64>>,
    pub bid_sizes: Vec<Vec<f64>>,
    pub ask_prices: Vec<Vec<f64>>,
    pub ask_sizes: Vec<Vec<f64>>,
}

impl DepthSeries {
    /// Number of recorded rows
    pub fn len(&self) -> usize {
        self.bid_prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bid_prices.is_empty()
    }

    fn push(&mut self, book: &OrderBook, depth: usize) {
        let (bid_prices, bid_sizes): (Vec<f64>, Vec<f64>) =
            book.best_bids(depth).map(|l| (l.price, l.quantity)).unzip();
        let (ask_prices, ask_sizes): (Vec<f64>, Vec<f64>) =
            book.best_asks(depth).map(|l| (l.price, l.quantity)).unzip();
        self.bid_prices.push(bid_prices);
        self.bid_sizes.push(bid_sizes);
        self.ask_prices.push(ask_prices);
        self.ask_sizes.push(ask_sizes);
    }
}

#[derive(Debug, Clone)]
pub struct DepthRecorder {
    depth: usize,
    log_every: usize,
    series: BTreeMap<i64, DepthSeries>,
}

impl DepthRecorder {
    pub fn new(depth: usize, log_every: usize) -> Self {
        DepthRecorder {
            depth,
            log_every: log_every.max(1),
            series: BTreeMap::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn series(&self, epoch: i64) -> Option<&DepthSeries> {
        self.series.get(&epoch)
    }

    /// Recorded series by epoch, ascending
    pub fn iter(&self) -> impl Iterator<Item = (i64, &DepthSeries)> + '_ {
        self.series.iter().map(|(&epoch, s)| (epoch, s))
    }

    pub fn into_series(self) -> BTreeMap<i64, DepthSeries> {
        self.series
    }
}

impl BookObserver for DepthRecorder {
    fn on_book_update(&mut self, book: &OrderBook) {
        let series = self.series.entry(book.id()).or_default();
        series.push(book, self.depth);

        let rows = series.len();
        if rows % self.log_every == 0 {
            info!(book_id = book.id(), rows, "recorded order book updates");
        }
    }
}

/// Price levels for one side of the book
///
/// Levels are keyed by price in a BTreeMap so best-price lookups and ranked
/// slices from either end stay logarithmic in the number of resident levels.
/// A level with zero quantity is a deletion marker and is never stored.

use std::collections::btree_map::Range;
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelError {
    #[error("level rank {rank} out of range: {available} levels resident")]
    OutOfRange { rank: usize, available: usize },
}

/// Aggregated quantity resting at one price
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceLevel {
    pub price: f64,
    pub quantity: f64,
}

impl PriceLevel {
    pub fn new(price: f64, quantity: f64) -> Self {
        PriceLevel { price, quantity }
    }

    /// True when this entry removes the level at its price
    pub fn is_deletion(&self) -> bool {
        self.quantity == 0.0
    }
}

type Key = OrderedFloat<f64>;

#[derive(Debug, Clone, Default)]
pub struct Levels {
    levels: BTreeMap<Key, PriceLevel>,
}

impl Levels {
    pub fn new() -> Self {
        Levels {
            levels: BTreeMap::new(),
        }
    }

    /// Apply entries in order: zero quantity removes, anything else inserts or replaces
    pub fn merge(&mut self, entries: &[PriceLevel]) {
        for level in entries {
            let key = OrderedFloat(level.price);
            if level.is_deletion() {
                self.levels.remove(&key);
            } else {
                self.levels.insert(key, *level);
            }
        }
    }

    /// The i-th highest resident level (1-indexed)
    /// Walks `rank` entries from the top, so O(rank + log n).
    pub fn nth_from_top(&self, rank: usize) -> Result<PriceLevel, LevelError> {
        self.check_rank(rank)?;
        self.levels
            .values()
            .rev()
            .nth(rank - 1)
            .copied()
            .ok_or(self.out_of_range(rank))
    }

    /// The i-th lowest resident level (1-indexed)
    /// Walks `rank` entries from the bottom, so O(rank + log n).
    pub fn nth_from_bottom(&self, rank: usize) -> Result<PriceLevel, LevelError> {
        self.check_rank(rank)?;
        self.levels
            .values()
            .nth(rank - 1)
            .copied()
            .ok_or(self.out_of_range(rank))
    }

    /// The `n` highest levels, high to low when `descending`, else low to high
    pub fn top_slice(&self, n: usize, descending: bool) -> LevelSlice<'_> {
        let window = self
            .levels
            .keys()
            .rev()
            .take(n)
            .last()
            .map(|&boundary| self.levels.range(boundary..));
        LevelSlice::new(window, !descending, n.min(self.len()))
    }

    /// The `n` lowest levels, low to high when `ascending`, else high to low
    pub fn bottom_slice(&self, n: usize, ascending: bool) -> LevelSlice<'_> {
        let window = self
            .levels
            .keys()
            .take(n)
            .last()
            .map(|&boundary| self.levels.range(..=boundary));
        LevelSlice::new(window, ascending, n.min(self.len()))
    }

    pub fn get(&self, price: f64) -> Option<&PriceLevel> {
        self.levels.get(&OrderedFloat(price))
    }

    /// All resident levels, ascending by price
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PriceLevel> + '_ {
        self.levels.values()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    fn check_rank(&self, rank: usize) -> Result<(), LevelError> {
        if rank == 0 || rank > self.levels.len() {
            return Err(self.out_of_range(rank));
        }
        Ok(())
    }

    fn out_of_range(&self, rank: usize) -> LevelError {
        LevelError::OutOfRange {
            rank,
            available: self.levels.len(),
        }
    }
}

/// Lazy ranked view over one side; clone it to walk the same window again
///
/// The window is the key range between the boundary level and the end of the
/// side, so building one costs O(k + log n) whichever way it is walked.
#[derive(Debug, Clone)]
pub struct LevelSlice<'a> {
    window: Option<Range<'a, Key, PriceLevel>>,
    ascending: bool,
    remaining: usize,
}

impl<'a> LevelSlice<'a> {
    fn new(window: Option<Range<'a, Key, PriceLevel>>, ascending: bool, remaining: usize) -> Self {
        LevelSlice {
            window,
            ascending,
            remaining,
        }
    }
}

impl<'a> Iterator for LevelSlice<'a> {
    type Item = PriceLevel;

    fn next(&mut self) -> Option<PriceLevel> {
        let range = self.window.as_mut()?;
        let next = if self.ascending {
            range.next()
        } else {
            range.next_back()
        };
        let (_, level) = next?;
        self.remaining -= 1;
        Some(*level)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a> ExactSizeIterator for LevelSlice<'a> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(prices: &[f64]) -> Levels {
        let mut levels = Levels::new();
        let entries: Vec<PriceLevel> = prices.iter().map(|&p| PriceLevel::new(p, 1.0)).collect();
        levels.merge(&entries);
        levels
    }

    fn prices(slice: LevelSlice<'_>) -> Vec<f64> {
        slice.map(|l| l.price).collect()
    }

    #[test]
    fn test_merge_replaces_and_removes() {
        let mut levels = side(&[10.0, 11.0, 12.0]);
        levels.merge(&[PriceLevel::new(11.0, 5.0), PriceLevel::new(12.0, 0.0)]);

        assert_eq!(levels.len(), 2);
        assert_eq!(levels.get(11.0).map(|l| l.quantity), Some(5.0));
        assert!(levels.get(12.0).is_none());
    }

    #[test]
    fn test_later_entry_wins_within_one_merge() {
        let mut levels = Levels::new();
        levels.merge(&[
            PriceLevel::new(10.0, 1.0),
            PriceLevel::new(10.0, 3.0),
            PriceLevel::new(11.0, 2.0),
            PriceLevel::new(11.0, 0.0),
        ]);

        assert_eq!(levels.len(), 1);
        assert_eq!(levels.get(10.0).map(|l| l.quantity), Some(3.0));
    }

    #[test]
    fn test_nth_from_either_end() {
        let levels = side(&[12.0, 10.0, 11.0]);
        assert_eq!(levels.nth_from_top(1).unwrap().price, 12.0);
        assert_eq!(levels.nth_from_top(3).unwrap().price, 10.0);
        assert_eq!(levels.nth_from_bottom(2).unwrap().price, 11.0);
    }

    #[test]
    fn test_nth_out_of_range() {
        let levels = side(&[10.0, 11.0]);
        assert_eq!(
            levels.nth_from_top(3),
            Err(LevelError::OutOfRange { rank: 3, available: 2 })
        );
        assert_eq!(
            levels.nth_from_bottom(0),
            Err(LevelError::OutOfRange { rank: 0, available: 2 })
        );
    }

    #[test]
    fn test_slice_directions() {
        let levels = side(&[10.0, 11.0, 12.0, 13.0]);
        assert_eq!(prices(levels.top_slice(2, true)), vec![13.0, 12.0]);
        assert_eq!(prices(levels.top_slice(2, false)), vec![12.0, 13.0]);
        assert_eq!(prices(levels.bottom_slice(2, true)), vec![10.0, 11.0]);
        assert_eq!(prices(levels.bottom_slice(2, false)), vec![11.0, 10.0]);
    }

    #[test]
    fn test_slice_truncates_and_restarts() {
        let levels = side(&[10.0, 11.0]);
        let slice = levels.top_slice(50, true);
        assert_eq!(slice.len(), 2);

        let again = slice.clone();
        assert_eq!(prices(slice), prices(again));
    }

    #[test]
    fn test_empty_and_zero_slices() {
        let levels = Levels::new();
        assert_eq!(levels.top_slice(5, false).len(), 0);
        assert_eq!(levels.bottom_slice(5, true).next(), None);

        let levels = side(&[10.0]);
        assert_eq!(prices(levels.top_slice(0, true)), Vec::<f64>::new());
        assert_eq!(prices(levels.bottom_slice(0, false)), Vec::<f64>::new());
    }

    #[test]
    fn test_reversed_slices_on_deep_side() {
        let prices_in: Vec<f64> = (0..50_000).map(|i| i as f64 * 0.5).collect();
        let levels = side(&prices_in);

        let mut descending = prices(levels.top_slice(10, true));
        descending.reverse();
        let ascending = levels.top_slice(10, false);
        assert_eq!(ascending.len(), 10);
        assert_eq!(prices(ascending), descending);
        assert_eq!(descending.first(), Some(&24_995.0));

        let mut ascending = prices(levels.bottom_slice(10, true));
        ascending.reverse();
        assert_eq!(prices(levels.bottom_slice(10, false)), ascending);
        assert_eq!(ascending.first(), Some(&4.5));
    }
}

/// Update-id sequencing and gap tracking
///
/// A diff covering `[first, last]` continues a book positioned at `U` only if
/// `first <= U + 1`. Anything starting later means ids were lost in between.

use thiserror::Error;

/// Raised when a book can no longer be advanced without missing updates
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("book {book_id}: received update {received} but expected {expected}")]
pub struct SequenceGap {
    pub book_id: i64,
    pub expected: i64,
    pub received: i64,
}

impl SequenceGap {
    /// Number of update ids never seen
    pub fn missing(&self) -> i64 {
        self.received - self.expected
    }
}

/// Where an update sits relative to a book's last applied id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequencing {
    /// Entirely behind the book
    Stale,
    /// Starts at or before the next expected id and extends the book
    Contiguous,
    Gap { expected: i64, received: i64 },
}

/// Classify a diff `[first_update_id, last_update_id]` against `last_applied`
pub fn classify(last_applied: i64, first_update_id: i64, last_update_id: i64) -> Sequencing {
    if last_update_id < last_applied {
        return Sequencing::Stale;
    }
    let expected = last_applied.saturating_add(1);
    if first_update_id > expected {
        return Sequencing::Gap {
            expected,
            received: first_update_id,
        };
    }
    Sequencing::Contiguous
}

/// History of gaps reported by retired books
#[derive(Debug, Clone, Default)]
pub struct GapDetector {
    gaps: Vec<SequenceGap>,
    total_missing: i64,
}

impl GapDetector {
    pub fn new() -> Self {
        GapDetector {
            gaps: Vec::new(),
            total_missing: 0,
        }
    }

    pub fn record(&mut self, gap: SequenceGap) {
        self.total_missing = self.total_missing.saturating_add(gap.missing());
        self.gaps.push(gap);
    }

    pub fn gaps(&self) -> &[SequenceGap] {
        &self.gaps
    }

    /// Total update ids missing across all recorded gaps
    pub fn total_missing(&self) -> i64 {
        self.total_missing
    }

    pub fn gap_count(&self) -> usize {
        self.gaps.len()
    }

    /// Check if an update id falls inside any recorded gap (`expected..received`, exclusive end)
    pub fn is_in_gap(&self, update_id: i64) -> bool {
        self.gaps
            .iter()
            .any(|g| update_id >= g.expected && update_id < g.received)
    }

    pub fn reset(&mut self) {
        self.gaps.clear();
        self.total_missing = 0;
    }
}

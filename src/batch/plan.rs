//! Batch sizing and partitioning.
//!
//! Both lookup tables are monotone in the contact count: larger sets get
//! larger batches and more concurrent units, trading fine-grained
//! responsiveness for fewer dispatch round-trips.

use std::ops::Range;

use super::BatchOptions;

/// Hard ceiling on concurrently running units.
pub const MAX_CONCURRENCY: usize = 8;

/// `(contact count upper bound, batch size)`, checked in order.
const BATCH_SIZE_TABLE: [(usize, usize); 4] = [(100, 25), (1_000, 100), (5_000, 250), (20_000, 500)];
/// Batch size beyond the last table row.
const MAX_BATCH_SIZE: usize = 1_000;

/// `(contact count upper bound, concurrent units)`, checked in order.
const CONCURRENCY_TABLE: [(usize, usize); 4] = [(100, 1), (1_000, 2), (5_000, 4), (20_000, 6)];

/// Recommended contacts per batch for a run over `contact_count` contacts.
pub fn recommended_batch_size(contact_count: usize) -> usize {
    BATCH_SIZE_TABLE
        .iter()
        .find(|(limit, _)| contact_count <= *limit)
        .map_or(MAX_BATCH_SIZE, |(_, size)| *size)
}

/// Recommended concurrent batches for a run over `contact_count` contacts.
pub fn recommended_concurrency(contact_count: usize) -> usize {
    CONCURRENCY_TABLE
        .iter()
        .find(|(limit, _)| contact_count <= *limit)
        .map_or(MAX_CONCURRENCY, |(_, units)| *units)
}

/// Resolved sizing for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    /// Contacts per batch.
    pub batch_size: usize,
    /// Batches run concurrently in each group.
    pub concurrency: usize,
    /// Contacts between progress reports inside a batch.
    pub chunk_size: usize,
    /// Number of batches.
    pub batch_count: usize,
}

impl BatchPlan {
    /// Resolve explicit options against the recommendation tables.
    ///
    /// Zero values are bumped to 1 and concurrency never exceeds
    /// [`MAX_CONCURRENCY`].
    pub fn for_contacts(contact_count: usize, options: &BatchOptions) -> Self {
        let batch_size = options
            .batch_size
            .unwrap_or_else(|| recommended_batch_size(contact_count))
            .max(1);
        let concurrency = options
            .max_concurrent_batches
            .unwrap_or_else(|| recommended_concurrency(contact_count))
            .clamp(1, MAX_CONCURRENCY);
        let chunk_size = options.chunk_size.clamp(1, batch_size);
        Self {
            batch_size,
            concurrency,
            chunk_size,
            batch_count: contact_count.div_ceil(batch_size),
        }
    }

    /// Contiguous index ranges, one per batch, in input order.
    pub fn batch_ranges(&self, contact_count: usize) -> Vec<Range<usize>> {
        (0..self.batch_count)
            .map(|i| {
                let start = i.saturating_mul(self.batch_size);
                let end = start.saturating_add(self.batch_size).min(contact_count);
                start..end
            })
            .collect()
    }
}

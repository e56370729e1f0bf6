//! Bounded-concurrency fan-out of the per-contact pipeline.
//!
//! The [`BatchCoordinator`] groups interactions by contact once, splits the
//! contact list into batches, and runs up to `concurrency` batches at a time
//! as tokio tasks. It waits for a whole group before starting the next one,
//! aggregates the units' chunk reports into one monotonic processed count,
//! and is the only place results are merged.
//!
//! Failure is fail-fast: the first unit error or panic aborts the run and no
//! partial results reach the caller.

pub mod cache;
pub mod plan;
mod worker;

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::analysis::{AnalysisError, ContactAnalysis};
use crate::config::BatchConfig;
use crate::progress::{ProgressTracker, Stage};
use crate::types::{AnalysisResult, Contact, EmailInteraction, SegmentTags};

pub use cache::ResultCache;
pub use plan::{recommended_batch_size, recommended_concurrency, BatchPlan, MAX_CONCURRENCY};

use worker::{BatchUnit, UnitMessage};

/// Buffered messages per group channel before units wait on the coordinator.
const UNIT_CHANNEL_CAPACITY: usize = 64;

/// Interactions grouped by contact id. Built once per run and shared
/// read-only with every unit.
pub type InteractionIndex = HashMap<String, Vec<EmailInteraction>>;

/// Group interactions by contact id in one pass.
pub fn group_by_contact(interactions: Vec<EmailInteraction>) -> InteractionIndex {
    let mut index = InteractionIndex::new();
    for interaction in interactions {
        index
            .entry(interaction.contact_id.clone())
            .or_default()
            .push(interaction);
    }
    index
}

/// Errors that abort a batch run.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A unit reported an analysis failure.
    #[error("batch {batch} failed: {source}")]
    Unit {
        /// Index of the failing batch.
        batch: usize,
        /// Underlying analysis error.
        #[source]
        source: AnalysisError,
    },

    /// A unit panicked.
    #[error("batch worker panicked: {0}")]
    UnitPanicked(String),

    /// A unit stopped without delivering its results.
    #[error("batch {0} ended without reporting results")]
    Incomplete(usize),

    /// The caller cancelled the run.
    #[error("analysis cancelled")]
    Cancelled,
}

/// Sizing overrides for one run. `None` defers to the recommendation tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Contacts per batch.
    pub batch_size: Option<usize>,
    /// Batches run concurrently per group.
    pub max_concurrent_batches: Option<usize>,
    /// Contacts between progress reports inside a batch.
    pub chunk_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&BatchConfig::default())
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_concurrent_batches: config.max_concurrent_batches,
            chunk_size: config.chunk_size,
        }
    }
}

/// Inputs for one run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Contacts to analyze, in caller order.
    pub contacts: Vec<Contact>,
    /// Interaction history for all contacts.
    pub interactions: Vec<EmailInteraction>,
    /// Segmentation tags attached verbatim to matching results.
    pub segments: SegmentTags,
    /// Sizing overrides.
    pub options: BatchOptions,
}

/// Runs a [`ContactAnalysis`] over a whole contact set.
#[derive(Clone)]
pub struct BatchCoordinator {
    analyzer: Arc<dyn ContactAnalysis>,
}

impl BatchCoordinator {
    /// Create a coordinator around an analyzer.
    pub fn new(analyzer: Arc<dyn ContactAnalysis>) -> Self {
        Self { analyzer }
    }

    /// Analyze every contact in `request`.
    ///
    /// Progress goes to `tracker`; success drives it to `complete`, failure
    /// to `error` (firing its error listener once) and cancellation to
    /// `cancelled`. Results are sorted by category priority, then by
    /// descending response rate.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError`] if any unit fails or panics, or if `cancel`
    /// fires. No partial results are returned in either case.
    pub async fn analyze_all(
        &self,
        request: AnalysisRequest,
        tracker: &mut ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<Vec<AnalysisResult>, BatchError> {
        match self.run(request, tracker, cancel).await {
            Ok(results) => {
                tracker.complete(format!("Analyzed {} contacts", results.len()));
                Ok(results)
            }
            Err(BatchError::Cancelled) => {
                warn!("batch analysis cancelled");
                tracker.cancel("Analysis cancelled");
                Err(BatchError::Cancelled)
            }
            Err(e) => {
                error!(error = %e, "batch analysis failed");
                tracker.fail(format!("Analysis failed: {e}"));
                Err(e)
            }
        }
    }

    /// [`analyze_all`](Self::analyze_all), replacing `cache` on success.
    /// A failed or cancelled run leaves the cache as it was.
    ///
    /// # Errors
    ///
    /// Same as [`analyze_all`](Self::analyze_all).
    pub async fn analyze_all_cached(
        &self,
        request: AnalysisRequest,
        tracker: &mut ProgressTracker,
        cancel: &CancellationToken,
        cache: &mut ResultCache,
    ) -> Result<Vec<AnalysisResult>, BatchError> {
        let results = self.analyze_all(request, tracker, cancel).await?;
        cache.replace_all(&results);
        Ok(results)
    }

    async fn run(
        &self,
        request: AnalysisRequest,
        tracker: &mut ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<Vec<AnalysisResult>, BatchError> {
        let AnalysisRequest {
            contacts,
            interactions,
            segments,
            options,
        } = request;
        let total = contacts.len();

        tracker.update(Stage::PreparingAnalysis, 0, total, "Grouping interactions");
        let index = Arc::new(group_by_contact(interactions));
        let plan = BatchPlan::for_contacts(total, &options);
        let ranges = plan.batch_ranges(total);
        info!(
            contacts = total,
            batches = plan.batch_count,
            batch_size = plan.batch_size,
            concurrency = plan.concurrency,
            "starting batch analysis"
        );
        tracker.update(
            Stage::PreparingAnalysis,
            total,
            total,
            format!("Planned {} batches", plan.batch_count),
        );

        let contacts: Arc<[Contact]> = contacts.into();
        let mut slots: Vec<Option<Vec<AnalysisResult>>> = ranges.iter().map(|_| None).collect();
        let mut processed = 0_usize;
        tracker.update(Stage::AnalyzingContacts, 0, total, "Analyzing contacts");

        let mut group_start = 0_usize;
        for group in ranges.chunks(plan.concurrency) {
            if cancel.is_cancelled() {
                return Err(BatchError::Cancelled);
            }
            let ctx = GroupContext {
                first_batch: group_start,
                contacts: &contacts,
                index: &index,
                chunk_size: plan.chunk_size,
                total,
            };
            self.run_group(ctx, group, &mut slots, &mut processed, tracker, cancel)
                .await?;
            group_start = group_start.saturating_add(group.len());
        }

        tracker.update(Stage::FinalizingResults, 0, total, "Merging results");
        let mut results: Vec<AnalysisResult> = slots.into_iter().flatten().flatten().collect();
        for result in &mut results {
            if let Some(tags) = segments.get(&result.contact_id) {
                result.tags.clone_from(tags);
            }
        }
        sort_results(&mut results);
        tracker.update(
            Stage::FinalizingResults,
            total,
            total,
            format!("Sorted {} results", results.len()),
        );
        Ok(results)
    }

    /// Run one group of batches concurrently and wait for all of them.
    async fn run_group(
        &self,
        ctx: GroupContext<'_>,
        group: &[Range<usize>],
        slots: &mut [Option<Vec<AnalysisResult>>],
        processed: &mut usize,
        tracker: &mut ProgressTracker,
        cancel: &CancellationToken,
    ) -> Result<(), BatchError> {
        let group_token = cancel.child_token();
        let (tx, mut rx) = mpsc::channel(UNIT_CHANNEL_CAPACITY);
        let mut units = JoinSet::new();

        for (offset, range) in group.iter().enumerate() {
            let unit = BatchUnit {
                batch: ctx.first_batch.saturating_add(offset),
                contacts: Arc::clone(ctx.contacts),
                range: range.clone(),
                chunk_size: ctx.chunk_size,
                index: Arc::clone(ctx.index),
                analyzer: Arc::clone(&self.analyzer),
                tx: tx.clone(),
                cancel: group_token.clone(),
            };
            units.spawn(unit.run());
        }
        // Only the units hold senders now; the channel closes when all exit.
        drop(tx);
        debug!(first_batch = ctx.first_batch, units = group.len(), "group dispatched");

        loop {
            // Panics are observed ahead of queued messages.
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => GroupEvent::Cancelled,
                Some(joined) = units.join_next(), if !units.is_empty() => GroupEvent::Joined(joined),
                message = rx.recv() => GroupEvent::Message(message),
            };

            match event {
                GroupEvent::Cancelled => {
                    group_token.cancel();
                    units.abort_all();
                    return Err(BatchError::Cancelled);
                }
                GroupEvent::Joined(Err(e)) if e.is_panic() => {
                    group_token.cancel();
                    units.abort_all();
                    return Err(BatchError::UnitPanicked(panic_message(e.into_panic())));
                }
                GroupEvent::Joined(_) => {}
                GroupEvent::Message(Some(UnitMessage::Progress { batch, processed: done })) => {
                    *processed = processed.saturating_add(done).min(ctx.total);
                    debug!(batch, processed = *processed, "chunk complete");
                    tracker.update(
                        Stage::AnalyzingContacts,
                        *processed,
                        ctx.total,
                        format!("Analyzed {} of {} contacts", *processed, ctx.total),
                    );
                }
                GroupEvent::Message(Some(UnitMessage::Finished { batch, results })) => {
                    if let Some(slot) = slots.get_mut(batch) {
                        *slot = Some(results);
                    }
                }
                GroupEvent::Message(Some(UnitMessage::Failed { batch, error })) => {
                    group_token.cancel();
                    units.abort_all();
                    return Err(BatchError::Unit {
                        batch,
                        source: error,
                    });
                }
                GroupEvent::Message(Some(UnitMessage::Cancelled { batch })) => {
                    debug!(batch, "unit stopped on cancellation");
                    units.abort_all();
                    return Err(BatchError::Cancelled);
                }
                GroupEvent::Message(None) => break,
            }
        }

        // Barrier: every unit has dropped its sender; surface late panics.
        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    return Err(BatchError::UnitPanicked(panic_message(e.into_panic())));
                }
            }
        }

        for offset in 0..group.len() {
            let batch = ctx.first_batch.saturating_add(offset);
            if slots.get(batch).is_some_and(Option::is_none) {
                return Err(BatchError::Incomplete(batch));
            }
        }
        Ok(())
    }
}

/// What woke the coordinator while a group was running.
enum GroupEvent {
    Cancelled,
    Joined(Result<(), JoinError>),
    Message(Option<UnitMessage>),
}

/// Shared, read-only state for dispatching one group.
struct GroupContext<'a> {
    first_batch: usize,
    contacts: &'a Arc<[Contact]>,
    index: &'a Arc<InteractionIndex>,
    chunk_size: usize,
    total: usize,
}

/// Stable sort by category priority, then by descending response rate.
pub fn sort_results(results: &mut [AnalysisResult]) {
    results.sort_by(|a, b| {
        a.category
            .priority()
            .cmp(&b.category.priority())
            .then_with(|| b.metrics.response_rate.total_cmp(&a.metrics.response_rate))
    });
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

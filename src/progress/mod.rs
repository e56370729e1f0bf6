//! Weighted multi-stage progress and ETA estimation.
//!
//! A run moves through a fixed sequence of work stages, each carrying a share
//! of the overall progress bar. Callers report `(stage, processed, total)`
//! as often as they like; entering a new stage is detected by comparing
//! against the current stage, so repeated intra-stage reports never redo the
//! transition bookkeeping.
//!
//! Overall progress never decreases during a run. Terminal stages
//! (`complete`, `error`, `cancelled`) freeze the tracker.

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

/// Progress value reported once a run has failed.
pub const ERROR_PROGRESS: f64 = -1.0;

/// Named phase of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Grouping interactions and planning batches.
    PreparingAnalysis,
    /// Running the per-contact pipeline.
    AnalyzingContacts,
    /// Merging and sorting results.
    FinalizingResults,
    /// Run finished successfully.
    Complete,
    /// Run aborted with an error.
    Error,
    /// Run stopped by the caller.
    Cancelled,
}

impl Stage {
    /// Work stages in execution order. Their weights sum to 1.
    pub const WORK_STAGES: [Stage; 3] = [
        Stage::PreparingAnalysis,
        Stage::AnalyzingContacts,
        Stage::FinalizingResults,
    ];

    /// Share of overall progress owned by this stage.
    pub fn weight(self) -> f64 {
        match self {
            Self::PreparingAnalysis => 0.05,
            Self::AnalyzingContacts => 0.85,
            Self::FinalizingResults => 0.10,
            Self::Complete | Self::Error | Self::Cancelled => 0.0,
        }
    }

    /// Whether the run is over once this stage is reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Cancelled)
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreparingAnalysis => "preparing_analysis",
            Self::AnalyzingContacts => "analyzing_contacts",
            Self::FinalizingResults => "finalizing_results",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Sum of the weights of all work stages before this one.
    fn preceding_weight(self) -> f64 {
        Self::WORK_STAGES
            .iter()
            .take_while(|s| **s != self)
            .map(|s| s.weight())
            .sum()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of run progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Stage the run is in.
    pub stage: Stage,
    /// Overall progress 0–100, or [`ERROR_PROGRESS`] after a failure.
    pub progress: f64,
    /// Human-readable status line.
    pub message: String,
    /// Estimated seconds remaining, when progress is positive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
    /// Items finished in the current stage.
    pub items_processed: usize,
    /// Items the current stage will process.
    pub total_items: usize,
}

type Callback = Box<dyn FnMut(&ProgressEvent) + Send>;

/// Stateful progress aggregator with optional listener callbacks.
pub struct ProgressTracker {
    current: Option<Stage>,
    completed_weight: f64,
    started_at: Option<Instant>,
    last_progress: f64,
    last_event: Option<ProgressEvent>,
    on_progress: Option<Callback>,
    on_complete: Option<Callback>,
    on_error: Option<Callback>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("current", &self.current)
            .field("last_progress", &self.last_progress)
            .finish_non_exhaustive()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Create a tracker with no listeners.
    pub fn new() -> Self {
        Self {
            current: None,
            completed_weight: 0.0,
            started_at: None,
            last_progress: 0.0,
            last_event: None,
            on_progress: None,
            on_complete: None,
            on_error: None,
        }
    }

    /// Listener for every emitted event, terminal ones included.
    pub fn with_progress(mut self, f: impl FnMut(&ProgressEvent) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Listener fired once when the run completes.
    pub fn with_completion(mut self, f: impl FnMut(&ProgressEvent) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Listener fired once when the run fails.
    pub fn with_error(mut self, f: impl FnMut(&ProgressEvent) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Current stage, if any update has been made.
    pub fn stage(&self) -> Option<Stage> {
        self.current
    }

    /// Most recent event.
    pub fn last_event(&self) -> Option<&ProgressEvent> {
        self.last_event.as_ref()
    }

    /// Whether the tracker has reached a terminal stage.
    pub fn is_finished(&self) -> bool {
        self.current.is_some_and(Stage::is_terminal)
    }

    /// Report progress within `stage`.
    ///
    /// Returns the emitted event, or `None` once the tracker is finished.
    /// Terminal stages are routed to [`complete`](Self::complete),
    /// [`fail`](Self::fail) and [`cancel`](Self::cancel).
    pub fn update(
        &mut self,
        stage: Stage,
        items_processed: usize,
        total_items: usize,
        message: impl Into<String>,
    ) -> Option<ProgressEvent> {
        match stage {
            Stage::Complete => return self.complete(message),
            Stage::Error => return self.fail(message),
            Stage::Cancelled => return self.cancel(message),
            _ => {}
        }
        if self.is_finished() {
            return None;
        }

        let now = Instant::now();
        let started_at = *self.started_at.get_or_insert(now);

        if self.current != Some(stage) {
            debug!(from = ?self.current, to = %stage, "progress stage transition");
            self.current = Some(stage);
            self.completed_weight = stage.preceding_weight();
        }

        let fraction = stage_fraction(items_processed, total_items);
        let computed = (self.completed_weight + stage.weight() * fraction) * 100.0;
        let progress = computed.clamp(self.last_progress, 100.0);
        self.last_progress = progress;

        let elapsed = now.saturating_duration_since(started_at).as_secs_f64();
        let event = ProgressEvent {
            stage,
            progress,
            message: message.into(),
            eta_seconds: estimate_eta(elapsed, progress),
            items_processed,
            total_items,
        };
        self.emit(event.clone());
        Some(event)
    }

    /// Finish the run: progress is forced to 100 and the completion
    /// listener fires.
    pub fn complete(&mut self, message: impl Into<String>) -> Option<ProgressEvent> {
        if self.is_finished() {
            return None;
        }
        self.current = Some(Stage::Complete);
        self.last_progress = 100.0;
        let (items_processed, total_items) = self.last_counts();
        let event = ProgressEvent {
            stage: Stage::Complete,
            progress: 100.0,
            message: message.into(),
            eta_seconds: Some(0),
            items_processed,
            total_items,
        };
        self.emit(event.clone());
        if let Some(cb) = self.on_complete.as_mut() {
            cb(&event);
        }
        Some(event)
    }

    /// Abort the run: progress becomes [`ERROR_PROGRESS`] and the error
    /// listener fires. No further updates are accepted.
    pub fn fail(&mut self, message: impl Into<String>) -> Option<ProgressEvent> {
        if self.is_finished() {
            return None;
        }
        self.current = Some(Stage::Error);
        let (items_processed, total_items) = self.last_counts();
        let event = ProgressEvent {
            stage: Stage::Error,
            progress: ERROR_PROGRESS,
            message: message.into(),
            eta_seconds: None,
            items_processed,
            total_items,
        };
        self.emit(event.clone());
        if let Some(cb) = self.on_error.as_mut() {
            cb(&event);
        }
        Some(event)
    }

    /// Stop the run at the caller's request. Progress keeps its last value
    /// and the error listener does not fire.
    pub fn cancel(&mut self, message: impl Into<String>) -> Option<ProgressEvent> {
        if self.is_finished() {
            return None;
        }
        self.current = Some(Stage::Cancelled);
        let (items_processed, total_items) = self.last_counts();
        let event = ProgressEvent {
            stage: Stage::Cancelled,
            progress: self.last_progress,
            message: message.into(),
            eta_seconds: None,
            items_processed,
            total_items,
        };
        self.emit(event.clone());
        Some(event)
    }

    fn last_counts(&self) -> (usize, usize) {
        self.last_event
            .as_ref()
            .map_or((0, 0), |e| (e.items_processed, e.total_items))
    }

    fn emit(&mut self, event: ProgressEvent) {
        if let Some(cb) = self.on_progress.as_mut() {
            cb(&event);
        }
        self.last_event = Some(event);
    }
}

/// Fraction of a stage done, clamped to `0.0..=1.0`. An empty stage counts
/// as not started.
fn stage_fraction(processed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let fraction = processed as f64 / total as f64;
    fraction.clamp(0.0, 1.0)
}

/// `elapsed / progress * (100 - progress)`, undefined at zero progress.
fn estimate_eta(elapsed_secs: f64, progress: f64) -> Option<u64> {
    if progress <= 0.0 {
        return None;
    }
    let remaining = elapsed_secs / progress * (100.0 - progress);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = remaining.max(0.0).round() as u64;
    Some(secs)
}

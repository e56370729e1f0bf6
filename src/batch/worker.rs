//! Isolated execution unit that analyzes one batch.
//!
//! A unit shares nothing mutable with its siblings: it reads its own
//! contacts' slices from the shared interaction index, builds a private
//! result list, and talks to the coordinator only through its channel.

use std::ops::Range;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::analysis::{AnalysisError, ContactAnalysis};
use crate::types::{AnalysisResult, Contact};

use super::InteractionIndex;

/// Messages a unit sends to the coordinator.
#[derive(Debug)]
pub(crate) enum UnitMessage {
    /// Another chunk of `processed` contacts is done.
    Progress { batch: usize, processed: usize },
    /// The whole batch is done.
    Finished {
        batch: usize,
        results: Vec<AnalysisResult>,
    },
    /// Analysis of a contact failed; the unit has stopped.
    Failed { batch: usize, error: AnalysisError },
    /// The unit observed cancellation at a chunk boundary and stopped.
    Cancelled { batch: usize },
}

/// One batch of work plus everything needed to run it.
pub(crate) struct BatchUnit {
    pub batch: usize,
    pub contacts: Arc<[Contact]>,
    pub range: Range<usize>,
    pub chunk_size: usize,
    pub index: Arc<InteractionIndex>,
    pub analyzer: Arc<dyn ContactAnalysis>,
    pub tx: mpsc::Sender<UnitMessage>,
    pub cancel: CancellationToken,
}

impl BatchUnit {
    /// Analyze the batch chunk by chunk, yielding between chunks.
    pub(crate) async fn run(self) {
        let batch = self.batch;
        let contacts = self.contacts.get(self.range.clone()).unwrap_or_default();
        let mut results = Vec::with_capacity(contacts.len());

        for chunk in contacts.chunks(self.chunk_size.max(1)) {
            if self.cancel.is_cancelled() {
                debug!(batch, "unit observed cancellation");
                let _ = self.tx.send(UnitMessage::Cancelled { batch }).await;
                return;
            }

            for contact in chunk {
                let interactions = self
                    .index
                    .get(&contact.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                match self.analyzer.analyze_contact(contact, interactions) {
                    Ok(result) => results.push(result),
                    Err(error) => {
                        let _ = self.tx.send(UnitMessage::Failed { batch, error }).await;
                        return;
                    }
                }
            }

            let progress = UnitMessage::Progress {
                batch,
                processed: chunk.len(),
            };
            if self.tx.send(progress).await.is_err() {
                // Coordinator gone; nobody wants the rest.
                return;
            }
            tokio::task::yield_now().await;
        }

        debug!(batch, contacts = results.len(), "unit finished");
        let _ = self.tx.send(UnitMessage::Finished { batch, results }).await;
    }
}

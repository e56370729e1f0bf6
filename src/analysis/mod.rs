//! Per-contact analysis pipeline.
//!
//! [`metrics`] and [`response`] derive raw numbers from one contact's
//! interactions, [`categorizer`] and [`confidence`] turn them into a category
//! and score, and [`analyzer`] composes the four into an
//! [`AnalysisResult`](crate::types::AnalysisResult).

pub mod analyzer;
pub mod categorizer;
pub mod confidence;
pub mod metrics;
pub mod response;

use crate::types::{AnalysisResult, Contact, EmailInteraction};

pub use analyzer::ContactAnalyzer;

/// Errors from analyzing a single contact.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// An interaction handed to the analyzer belongs to another contact.
    #[error("interaction {interaction_id} does not belong to contact {contact_id}")]
    ContactMismatch {
        /// Contact being analyzed.
        contact_id: String,
        /// Offending interaction.
        interaction_id: String,
    },

    /// Analyzer-specific failure.
    #[error("analysis failed for contact {contact_id}: {reason}")]
    Failed {
        /// Contact being analyzed.
        contact_id: String,
        /// What went wrong.
        reason: String,
    },
}

/// Seam between the batch coordinator and the per-contact pipeline.
///
/// Implementations must be pure with respect to their inputs: the
/// coordinator runs them concurrently from several workers.
pub trait ContactAnalysis: Send + Sync {
    /// Analyze one contact given only that contact's interactions.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] when the input is inconsistent or the
    /// implementation cannot produce a result.
    fn analyze_contact(
        &self,
        contact: &Contact,
        interactions: &[EmailInteraction],
    ) -> Result<AnalysisResult, AnalysisError>;
}

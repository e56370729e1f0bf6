//! Contracts for the collaborators that feed the analysis core.
//!
//! The mail service client, identity handling and segmentation config live
//! outside this crate. [`JsonExport`] implements both contracts from an
//! exported snapshot so the core can run offline.

use std::cmp::Reverse;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::types::{Contact, EmailInteraction, SegmentTags};

/// Errors from a contact or interaction source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Reading the underlying data failed.
    #[error("source read failed: {0}")]
    Io(#[from] std::io::Error),

    /// The data did not match the expected schema.
    #[error("source parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The source cannot serve requests right now.
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Mail and identity collaborator.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// All contacts known for the mailbox owner.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the contact list cannot be fetched.
    async fn contacts(&self) -> Result<Vec<Contact>, SourceError>;

    /// Up to `limit` interactions. When more exist, the most recent win.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the history cannot be fetched.
    async fn interactions(&self, limit: usize) -> Result<Vec<EmailInteraction>, SourceError>;
}

/// Segmentation collaborator (e.g. flags for internal staff or partners).
pub trait SegmentSource: Send + Sync {
    /// Tags to attach per contact id.
    fn segment_tags(&self) -> SegmentTags;
}

/// Exported snapshot of contacts, interactions and segment tags.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JsonExport {
    contacts: Vec<Contact>,
    interactions: Vec<EmailInteraction>,
    segments: SegmentTags,
}

impl JsonExport {
    /// Parse an export from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Parse`] on malformed JSON. Unparseable
    /// interaction timestamps are not errors; those interactions are kept
    /// and later excluded from metrics.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let export: JsonExport = serde_json::from_str(json)?;
        let undated = export
            .interactions
            .iter()
            .filter(|i| i.timestamp.is_none())
            .count();
        if undated > 0 {
            debug!(undated, "export contains interactions without a usable timestamp");
        }
        Ok(export)
    }

    /// Read and parse an export file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, SourceError> {
        let json = tokio::fs::read_to_string(path).await?;
        let export = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            contacts = export.contacts.len(),
            interactions = export.interactions.len(),
            "export loaded"
        );
        Ok(export)
    }
}

#[async_trait]
impl MailSource for JsonExport {
    async fn contacts(&self) -> Result<Vec<Contact>, SourceError> {
        Ok(self.contacts.clone())
    }

    async fn interactions(&self, limit: usize) -> Result<Vec<EmailInteraction>, SourceError> {
        let mut interactions = self.interactions.clone();
        if interactions.len() > limit {
            // Newest first; undated interactions sort last.
            interactions.sort_by_key(|i| Reverse(i.timestamp));
            interactions.truncate(limit);
        }
        Ok(interactions)
    }
}

impl SegmentSource for JsonExport {
    fn segment_tags(&self) -> SegmentTags {
        self.segments.clone()
    }
}

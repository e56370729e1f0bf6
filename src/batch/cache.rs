//! Volatile per-run result cache.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::types::AnalysisResult;

/// Latest analysis results keyed by contact id.
///
/// Not authoritative: it can be dropped at any time and is replaced
/// wholesale after every successful run.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    entries: HashMap<String, AnalysisResult>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl ResultCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every entry with `results`.
    pub fn replace_all(&mut self, results: &[AnalysisResult]) {
        self.entries = results
            .iter()
            .map(|r| (r.contact_id.clone(), r.clone()))
            .collect();
        self.refreshed_at = Some(Utc::now());
    }

    /// Cached result for a contact.
    pub fn get(&self, contact_id: &str) -> Option<&AnalysisResult> {
        self.entries.get(contact_id)
    }

    /// Number of cached contacts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the cache was last replaced.
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.refreshed_at = None;
    }
}

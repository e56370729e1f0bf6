//! Core domain types shared by the analysis pipeline and the batch coordinator.
//!
//! Interactions and contacts are read-only inputs supplied by the mail
//! collaborator. [`Metrics`] and [`AnalysisResult`] are derived values created
//! fresh on every run.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Direction of a single email relative to the mailbox owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The owner sent this email to the contact.
    Sent,
    /// The owner received this email from the contact.
    Received,
}

/// One directed email event tied to a contact and optionally a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailInteraction {
    /// Message identifier from the mail service.
    pub id: String,
    /// Contact this interaction belongs to.
    pub contact_id: String,
    /// Subject line.
    #[serde(default)]
    pub subject: String,
    /// When the message was sent or received.
    ///
    /// `None` when the source value could not be parsed; such interactions
    /// are excluded from every metric.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Sent or received.
    pub direction: Direction,
    /// Conversation thread, if the mail service reported one.
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl EmailInteraction {
    /// Grouping key for reply matching and conversation counting.
    pub fn thread_key(&self) -> ThreadKey<'_> {
        match self.thread_id.as_deref() {
            Some(id) => ThreadKey::Thread(id),
            None => ThreadKey::Global,
        }
    }
}

/// Thread grouping key.
///
/// Interactions without a thread id all share the contact's implicit
/// [`ThreadKey::Global`] conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThreadKey<'a> {
    /// Explicit thread reported by the mail service.
    Thread(&'a str),
    /// Implicit per-contact thread for interactions without a thread id.
    Global,
}

/// Opaque contact identity supplied by the mail collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Stable contact identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Primary email address.
    #[serde(default)]
    pub email: String,
}

/// Segmentation tags by contact id (e.g. internal staff, partner).
///
/// Supplied by a collaborator and attached to results without interpretation.
pub type SegmentTags = HashMap<String, Vec<String>>;

/// Accept RFC 3339 strings or epoch milliseconds; anything else becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_timestamp_value))
}

/// Parse a loosely-typed timestamp value.
pub fn parse_timestamp_value(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Derived values
// ---------------------------------------------------------------------------

/// Whole days since the most recent interaction.
///
/// `Never` is the "infinite" sentinel for contacts with no usable
/// interactions and compares greater than any day count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DaysSince {
    /// Finite number of days.
    Days(u32),
    /// No interaction on record.
    #[default]
    Never,
}

impl DaysSince {
    /// True when the contact was reached within `days` days (inclusive).
    pub fn at_most(self, days: u32) -> bool {
        matches!(self, Self::Days(d) if d <= days)
    }

    /// True when the last contact is strictly fewer than `days` days ago.
    pub fn less_than(self, days: u32) -> bool {
        matches!(self, Self::Days(d) if d < days)
    }
}

impl fmt::Display for DaysSince {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(d) => write!(f, "{d}"),
            Self::Never => f.write_str("never"),
        }
    }
}

/// Per-contact engagement metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Interactions with a usable timestamp.
    pub total_emails: u32,
    /// Emails the owner sent.
    pub sent_emails: u32,
    /// Emails the owner received.
    pub received_emails: u32,
    /// Interactions within the recent window (30 days by default).
    pub emails_last_30_days: u32,
    /// Interactions within the extended window (90 days by default).
    pub emails_last_90_days: u32,
    /// Days since the latest interaction.
    pub days_since_last_contact: DaysSince,
    /// Fraction of sent emails that received a timely reply (0.0–1.0).
    pub response_rate: f64,
    /// Mean reply latency in hours across replied emails.
    pub average_response_time_hours: f64,
    /// Distinct conversations, counting the implicit global thread once.
    pub conversation_count: u32,
}

/// Engagement category, listed in attention priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Contacted recently or frequently.
    Recent,
    /// Steady two-way relationship, not necessarily recent.
    InTouch,
    /// Nothing that qualifies as current engagement.
    Inactive,
}

impl Category {
    /// Sort priority: lower sorts first.
    pub fn priority(self) -> u8 {
        match self {
            Self::Recent => 0,
            Self::InTouch => 1,
            Self::Inactive => 2,
        }
    }

    /// Wire name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::InTouch => "in_touch",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of analyzing one contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Contact the result describes.
    pub contact_id: String,
    /// Engagement category.
    pub category: Category,
    /// Confidence in the category (0–100).
    pub confidence_score: u8,
    /// Metrics the category and score were derived from.
    pub metrics: Metrics,
    /// Human-readable observations, in generation order.
    pub insights: Vec<String>,
    /// Segmentation tags supplied by the caller, attached verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Reference instant the analysis was computed against.
    pub analyzed_at: DateTime<Utc>,
}

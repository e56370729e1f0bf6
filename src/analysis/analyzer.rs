//! Composes metrics, response estimation, categorization and scoring into
//! one [`AnalysisResult`] per contact.

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::config::PolicyConfig;
use crate::types::{AnalysisResult, Category, Contact, DaysSince, EmailInteraction, Metrics};

use super::categorizer::categorize;
use super::confidence::confidence_score;
use super::metrics::calculate_metrics;
use super::response::{estimate_response, ResponseStats};
use super::{AnalysisError, ContactAnalysis};

/// Contacts reached within this many days get a "very recent" insight.
const VERY_RECENT_DAYS: u32 = 7;
/// Contacts silent for longer than this get a "gone quiet" insight.
const DORMANT_DAYS: u32 = 180;
/// Rate above which the response rate is called excellent.
const EXCELLENT_RESPONSE_RATE: f64 = 0.7;
/// Rate below which the response rate is called low...
const LOW_RESPONSE_RATE: f64 = 0.2;
/// ...once at least this many emails were sent.
const LOW_RESPONSE_MIN_SENT: u32 = 3;
/// Mean reply latency under this is called fast.
const FAST_REPLY_HOURS: f64 = 24.0;
/// Emails in the short window that make a frequent correspondent.
const FREQUENT_EMAILS: u32 = 10;

/// Per-contact analyzer bound to a policy table and a reference instant.
///
/// Fixing `as_of` up front makes every contact in a run share the same
/// notion of "now", so repeated runs over identical input agree exactly.
#[derive(Debug, Clone)]
pub struct ContactAnalyzer {
    policy: PolicyConfig,
    as_of: DateTime<Utc>,
}

impl ContactAnalyzer {
    /// Create an analyzer evaluating recency against `as_of`.
    pub fn new(policy: PolicyConfig, as_of: DateTime<Utc>) -> Self {
        Self { policy, as_of }
    }

    /// Reference instant for recency windows.
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Policy table in effect.
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Analyze one contact's interactions.
    ///
    /// The caller is responsible for passing only this contact's
    /// interactions; see [`ContactAnalysis::analyze_contact`] for the
    /// checked variant.
    pub fn analyze(&self, contact_id: &str, interactions: &[EmailInteraction]) -> AnalysisResult {
        let mut metrics = calculate_metrics(interactions, self.as_of, &self.policy.windows);

        let reply_window = Duration::days(i64::from(self.policy.windows.reply_window_days));
        let response = estimate_response(interactions, reply_window);
        metrics.response_rate = response.rate;
        metrics.average_response_time_hours = response.average_hours;

        let category = categorize(&metrics, &self.policy.category);
        let confidence_score = confidence_score(&metrics, category, &self.policy.scoring);
        let insights = generate_insights(&metrics, &response, category);

        trace!(
            contact = contact_id,
            category = %category,
            confidence = confidence_score,
            "contact analyzed"
        );

        AnalysisResult {
            contact_id: contact_id.to_owned(),
            category,
            confidence_score,
            metrics,
            insights,
            tags: Vec::new(),
            analyzed_at: self.as_of,
        }
    }
}

impl ContactAnalysis for ContactAnalyzer {
    fn analyze_contact(
        &self,
        contact: &Contact,
        interactions: &[EmailInteraction],
    ) -> Result<AnalysisResult, AnalysisError> {
        if let Some(stray) = interactions.iter().find(|i| i.contact_id != contact.id) {
            return Err(AnalysisError::ContactMismatch {
                contact_id: contact.id.clone(),
                interaction_id: stray.id.clone(),
            });
        }
        Ok(self.analyze(&contact.id, interactions))
    }
}

/// Threshold-triggered observations. Purely presentational: nothing here
/// feeds back into category or score.
fn generate_insights(metrics: &Metrics, response: &ResponseStats, category: Category) -> Vec<String> {
    let mut insights = Vec::new();

    match metrics.days_since_last_contact {
        DaysSince::Never => insights.push("No email history with this contact".to_owned()),
        DaysSince::Days(0) => insights.push("Contacted today".to_owned()),
        DaysSince::Days(d) if d < VERY_RECENT_DAYS => {
            insights.push(format!("Very recent contact ({d} days ago)"));
        }
        DaysSince::Days(d) if d > DORMANT_DAYS => {
            insights.push(format!("No contact in over {DORMANT_DAYS} days ({d} days)"));
        }
        DaysSince::Days(_) => {}
    }

    if response.sent > 0 && metrics.response_rate > EXCELLENT_RESPONSE_RATE {
        insights.push(format!(
            "Excellent response rate ({})",
            percent(metrics.response_rate)
        ));
    } else if response.sent >= LOW_RESPONSE_MIN_SENT && metrics.response_rate < LOW_RESPONSE_RATE {
        insights.push(format!(
            "Low response rate ({} of {} emails answered)",
            response.replied, response.sent
        ));
    }

    if response.replied > 0 && metrics.average_response_time_hours < FAST_REPLY_HOURS {
        insights.push(format!(
            "Usually replies within a day (avg {:.1}h)",
            metrics.average_response_time_hours
        ));
    }

    if metrics.emails_last_30_days >= FREQUENT_EMAILS {
        insights.push(format!(
            "Frequent correspondent ({} emails in the last 30 days)",
            metrics.emails_last_30_days
        ));
    }

    let summary = match category {
        Category::Recent => "Active relationship",
        Category::InTouch => "Steady two-way correspondence",
        Category::Inactive if metrics.total_emails == 0 => "Never contacted",
        Category::Inactive => "Relationship has gone quiet",
    };
    insights.push(summary.to_owned());

    insights
}

fn percent(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

//! Single-pass metrics over one contact's interaction history.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::config::WindowPolicy;
use crate::types::{DaysSince, Direction, EmailInteraction, Metrics};

/// Compute counts, recency windows and conversation count.
///
/// `response_rate` and `average_response_time_hours` are left at zero; see
/// [`estimate_response`](super::response::estimate_response). Interactions
/// without a usable timestamp are skipped entirely. The result does not
/// depend on input order.
pub fn calculate_metrics(
    interactions: &[EmailInteraction],
    now: DateTime<Utc>,
    windows: &WindowPolicy,
) -> Metrics {
    let short_cutoff = window_start(now, windows.recent_days);
    let long_cutoff = window_start(now, windows.extended_days);

    let mut metrics = Metrics::default();
    let mut last_contact: Option<DateTime<Utc>> = None;
    let mut threads = HashSet::new();

    for interaction in interactions {
        let Some(ts) = interaction.timestamp else {
            tracing::debug!(
                interaction = %interaction.id,
                contact = %interaction.contact_id,
                "skipping interaction without a parseable timestamp"
            );
            continue;
        };

        metrics.total_emails = metrics.total_emails.saturating_add(1);
        match interaction.direction {
            Direction::Sent => metrics.sent_emails = metrics.sent_emails.saturating_add(1),
            Direction::Received => {
                metrics.received_emails = metrics.received_emails.saturating_add(1);
            }
        }

        if ts >= short_cutoff {
            metrics.emails_last_30_days = metrics.emails_last_30_days.saturating_add(1);
        }
        if ts >= long_cutoff {
            metrics.emails_last_90_days = metrics.emails_last_90_days.saturating_add(1);
        }

        last_contact = Some(last_contact.map_or(ts, |prev| prev.max(ts)));
        threads.insert(interaction.thread_key());
    }

    metrics.days_since_last_contact = match last_contact {
        Some(last) => DaysSince::Days(whole_days_between(last, now)),
        None => DaysSince::Never,
    };
    metrics.conversation_count = u32::try_from(threads.len()).unwrap_or(u32::MAX);
    metrics
}

/// Earliest instant inside a `days`-day window ending at `now`. Windows
/// reaching past the representable range start at the minimum instant.
fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Whole days from `earlier` to `later`, floored and clamped at zero.
fn whole_days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> u32 {
    let days = (later - earlier).num_days().max(0);
    u32::try_from(days).unwrap_or(u32::MAX)
}

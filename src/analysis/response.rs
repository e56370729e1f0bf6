//! Thread-aware reply matching.
//!
//! Every sent message is matched to the first received message in the same
//! thread that arrives strictly after it. Each thread's timestamps are sorted
//! once and searched with a binary search, so a contact with `n`
//! interactions costs O(n log n) rather than comparing every pair.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::types::{Direction, EmailInteraction, ThreadKey};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Response statistics for one contact.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResponseStats {
    /// `replied / sent`, or 0.0 when nothing was sent.
    pub rate: f64,
    /// Mean reply latency in hours, or 0.0 when nothing was replied.
    pub average_hours: f64,
    /// Sent messages considered.
    pub sent: u32,
    /// Sent messages with a reply inside the window.
    pub replied: u32,
}

#[derive(Default)]
struct ThreadTimeline {
    sent: Vec<DateTime<Utc>>,
    received: Vec<DateTime<Utc>>,
}

/// Estimate response rate and mean reply latency.
///
/// A reply counts only when it lands strictly less than `reply_window` after
/// the sent message. Interactions without a timestamp are ignored.
pub fn estimate_response(interactions: &[EmailInteraction], reply_window: Duration) -> ResponseStats {
    let mut threads: HashMap<ThreadKey<'_>, ThreadTimeline> = HashMap::new();
    for interaction in interactions {
        let Some(ts) = interaction.timestamp else {
            continue;
        };
        let timeline = threads.entry(interaction.thread_key()).or_default();
        match interaction.direction {
            Direction::Sent => timeline.sent.push(ts),
            Direction::Received => timeline.received.push(ts),
        }
    }

    let mut sent: u32 = 0;
    let mut replied: u32 = 0;
    // Integer milliseconds keep the mean independent of summation order.
    let mut total_latency_ms: i64 = 0;

    for timeline in threads.values_mut() {
        if timeline.sent.is_empty() {
            continue;
        }
        timeline.sent.sort_unstable();
        timeline.received.sort_unstable();

        for &sent_at in &timeline.sent {
            sent = sent.saturating_add(1);
            let idx = timeline.received.partition_point(|r| *r <= sent_at);
            let Some(&reply_at) = timeline.received.get(idx) else {
                continue;
            };
            let latency = reply_at - sent_at;
            if latency < reply_window {
                replied = replied.saturating_add(1);
                total_latency_ms = total_latency_ms.saturating_add(latency.num_milliseconds());
            }
        }
    }

    if sent == 0 {
        return ResponseStats::default();
    }

    let rate = f64::from(replied) / f64::from(sent);
    let average_hours = if replied == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let total = total_latency_ms as f64;
        total / f64::from(replied) / MILLIS_PER_HOUR
    };

    ResponseStats {
        rate: rate.clamp(0.0, 1.0),
        average_hours: average_hours.max(0.0),
        sent,
        replied,
    }
}

//! Additive confidence heuristic.

use crate::config::ScoringPolicy;
use crate::types::{Category, Metrics};

/// Upper bound of the confidence scale.
pub const MAX_CONFIDENCE: u8 = 100;

/// Score how much the category can be trusted, clamped to `0..=100`.
///
/// The tiers stack: a contact reached 3 days ago collects both the
/// freshness and the recency bonus.
pub fn confidence_score(metrics: &Metrics, category: Category, policy: &ScoringPolicy) -> u8 {
    let mut score = policy.base;

    if metrics.total_emails > policy.volume_threshold {
        score = score.saturating_add(policy.volume_bonus);
    }
    if metrics.total_emails > policy.high_volume_threshold {
        score = score.saturating_add(policy.high_volume_bonus);
    }

    let days = metrics.days_since_last_contact;
    if days.less_than(policy.fresh_days) {
        score = score.saturating_add(policy.fresh_bonus);
    }
    if days.less_than(policy.recent_days) {
        score = score.saturating_add(policy.recent_bonus);
    }

    if metrics.response_rate > policy.strong_response_rate {
        score = score.saturating_add(policy.strong_response_bonus);
    }
    if metrics.response_rate > policy.good_response_rate {
        score = score.saturating_add(policy.good_response_bonus);
    }

    let adjustment = match category {
        Category::Recent => policy.recent_adjustment,
        Category::InTouch => policy.in_touch_adjustment,
        Category::Inactive => policy.inactive_adjustment,
    };
    score = score.saturating_add(adjustment);

    let clamped = score.clamp(0, i32::from(MAX_CONFIDENCE));
    u8::try_from(clamped).unwrap_or(MAX_CONFIDENCE)
}

//! Metrics → engagement category decision rules.

use crate::config::CategoryPolicy;
use crate::types::{Category, Metrics};

/// Map metrics to a category. Rules are checked in priority order and the
/// first match wins.
pub fn categorize(metrics: &Metrics, policy: &CategoryPolicy) -> Category {
    let days = metrics.days_since_last_contact;

    let recent = days.at_most(policy.recent_max_days)
        || metrics.emails_last_30_days >= policy.recent_min_emails_short
        || (metrics.emails_last_90_days >= policy.recent_min_emails_long
            && metrics.response_rate >= policy.recent_min_response_rate);
    if recent {
        return Category::Recent;
    }

    let in_touch = metrics.total_emails >= policy.in_touch_min_emails
        && metrics.response_rate >= policy.in_touch_min_response_rate
        && days.at_most(policy.in_touch_max_days);
    if in_touch {
        return Category::InTouch;
    }

    Category::Inactive
}

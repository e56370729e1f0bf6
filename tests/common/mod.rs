//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use rapport::analysis::ContactAnalyzer;
use rapport::config::PolicyConfig;
use rapport::types::{Contact, Direction, EmailInteraction};

/// Fixed reference instant for every test.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
        .single()
        .expect("valid fixed timestamp")
}

/// `days` whole days before [`now`].
pub fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

pub fn interaction(
    id: &str,
    contact_id: &str,
    direction: Direction,
    timestamp: DateTime<Utc>,
    thread_id: Option<&str>,
) -> EmailInteraction {
    EmailInteraction {
        id: id.to_owned(),
        contact_id: contact_id.to_owned(),
        subject: format!("subject {id}"),
        timestamp: Some(timestamp),
        direction,
        thread_id: thread_id.map(str::to_owned),
    }
}

pub fn sent(id: &str, timestamp: DateTime<Utc>, thread_id: Option<&str>) -> EmailInteraction {
    interaction(id, "c1", Direction::Sent, timestamp, thread_id)
}

pub fn received(id: &str, timestamp: DateTime<Utc>, thread_id: Option<&str>) -> EmailInteraction {
    interaction(id, "c1", Direction::Received, timestamp, thread_id)
}

pub fn contact(id: &str) -> Contact {
    Contact {
        id: id.to_owned(),
        name: format!("Contact {id}"),
        email: format!("{id}@example.com"),
    }
}

/// Analyzer with the default policy evaluated at [`now`].
pub fn analyzer() -> ContactAnalyzer {
    ContactAnalyzer::new(PolicyConfig::default(), now())
}

/// A varied history for contact `contact_id`, derived from `seed`.
pub fn synthetic_history(contact_id: &str, seed: u64) -> Vec<EmailInteraction> {
    let count = seed % 9;
    (0..count)
        .map(|i| {
            let offset_hours = i64::try_from((seed.wrapping_mul(37) + i * 53) % (24 * 200))
                .expect("small value");
            let direction = if (seed + i) % 3 == 0 {
                Direction::Received
            } else {
                Direction::Sent
            };
            let thread = if i % 2 == 0 { Some("t-main") } else { None };
            interaction(
                &format!("{contact_id}-{i}"),
                contact_id,
                direction,
                now() - Duration::hours(offset_hours),
                thread,
            )
        })
        .collect()
}

//! Tests for the JSON export source.

use chrono::{TimeZone, Utc};

use rapport::source::{JsonExport, MailSource, SegmentSource, SourceError};
use rapport::types::Direction;

const EXPORT: &str = r#"{
  "contacts": [
    { "id": "c1", "name": "Ada", "email": "ada@example.com" },
    { "id": "c2" }
  ],
  "interactions": [
    { "id": "m1", "contactId": "c1", "subject": "hi", "timestamp": "2026-02-20T09:00:00Z", "direction": "sent", "threadId": "t1" },
    { "id": "m2", "contactId": "c1", "timestamp": 1771578000000, "direction": "received", "threadId": "t1" },
    { "id": "m3", "contactId": "c1", "timestamp": "last tuesday", "direction": "received" },
    { "id": "m4", "contactId": "c2", "timestamp": null, "direction": "sent" },
    { "id": "m5", "contactId": "c2", "timestamp": "2026-01-05T10:00:00+02:00", "direction": "sent" }
  ],
  "segments": { "c2": ["internal"] }
}"#;

fn export() -> JsonExport {
    match JsonExport::from_json(EXPORT) {
        Ok(export) => export,
        Err(err) => panic!("export should parse: {err}"),
    }
}

#[tokio::test]
async fn contacts_are_read_with_defaults() {
    let contacts = export().contacts().await.expect("contacts");
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0].name, "Ada");
    assert_eq!(contacts[1].id, "c2");
    assert!(contacts[1].email.is_empty());
}

#[tokio::test]
async fn timestamps_are_parsed_leniently() {
    let interactions = export().interactions(100).await.expect("interactions");
    assert_eq!(interactions.len(), 5);

    let by_id = |id: &str| {
        interactions
            .iter()
            .find(|i| i.id == id)
            .unwrap_or_else(|| panic!("interaction {id} should exist"))
    };
    assert_eq!(
        by_id("m1").timestamp,
        Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).single()
    );
    assert_eq!(by_id("m2").timestamp, Utc.timestamp_millis_opt(1_771_578_000_000).single());
    assert_eq!(by_id("m2").direction, Direction::Received);
    assert_eq!(by_id("m3").timestamp, None);
    assert_eq!(by_id("m4").timestamp, None);
    assert_eq!(
        by_id("m5").timestamp,
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).single()
    );
    assert_eq!(by_id("m3").thread_id, None);
}

#[tokio::test]
async fn limit_keeps_most_recent_interactions() {
    let interactions = export().interactions(2).await.expect("interactions");
    let ids: Vec<&str> = interactions.iter().map(|i| i.id.as_str()).collect();
    // m2 is 2026-02-20T09:00:00Z as epoch millis, tied with m1.
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"m1"));
    assert!(ids.contains(&"m2"));
}

#[tokio::test]
async fn limit_drops_undated_interactions_first() {
    let interactions = export().interactions(4).await.expect("interactions");
    assert_eq!(interactions.len(), 4);
    assert_eq!(interactions.iter().filter(|i| i.timestamp.is_none()).count(), 1);
}

#[test]
fn segment_tags_are_exposed() {
    let tags = export().segment_tags();
    assert_eq!(tags.get("c2"), Some(&vec!["internal".to_owned()]));
    assert!(tags.get("c1").is_none());
}

#[test]
fn missing_sections_default_to_empty() {
    let export = JsonExport::from_json("{}").expect("empty export");
    assert!(export.segment_tags().is_empty());
}

#[test]
fn malformed_json_is_a_parse_error() {
    let err = JsonExport::from_json("{ \"contacts\": [");
    assert!(matches!(err, Err(SourceError::Parse(_))));
}

#[test]
fn unknown_direction_is_a_parse_error() {
    let err = JsonExport::from_json(
        r#"{ "interactions": [ { "id": "x", "contactId": "c", "direction": "forwarded" } ] }"#,
    );
    assert!(matches!(err, Err(SourceError::Parse(_))));
}

#[tokio::test]
async fn load_reads_file() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("export.json");
    tokio::fs::write(&path, EXPORT).await.expect("write export");

    let export = JsonExport::load(&path).await.expect("load export");
    assert_eq!(export.contacts().await.expect("contacts").len(), 2);
}

#[tokio::test]
async fn load_missing_file_is_io_error() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let err = JsonExport::load(&tmp.path().join("nope.json")).await;
    assert!(matches!(err, Err(SourceError::Io(_))));
}

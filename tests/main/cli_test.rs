//! CLI contract tests.

use std::path::Path;

use assert_cmd::Command;

const EXPORT: &str = r#"{
  "contacts": [
    { "id": "quiet", "name": "Quiet" },
    { "id": "fresh", "name": "Fresh" }
  ],
  "interactions": [
    { "id": "m1", "contactId": "fresh", "timestamp": "2999-01-01T00:00:00Z", "direction": "sent" }
  ],
  "segments": { "quiet": ["internal"] }
}"#;

fn rapport(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("rapport").expect("binary should build");
    cmd.env("RAPPORT_CONFIG_PATH", config_dir.join("absent.toml"))
        .env_remove("RAPPORT_BATCH_SIZE")
        .env_remove("RAPPORT_MAX_CONCURRENCY")
        .env_remove("RAPPORT_CHUNK_SIZE")
        .env("RUST_LOG", "warn");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("command should run");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8 stdout")
}

#[test]
fn plan_prints_recommended_sizing() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let stdout = stdout_of(rapport(tmp.path()).args(["plan", "10000"]));
    assert!(stdout.contains("batch size:  500"));
    assert!(stdout.contains("concurrency: 6"));
    assert!(stdout.contains("batches:     20"));
}

#[test]
fn analyze_prints_sorted_json() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let input = tmp.path().join("export.json");
    std::fs::write(&input, EXPORT).expect("write export");

    let stdout = stdout_of(rapport(tmp.path()).arg("analyze").arg("--input").arg(&input));
    let results: serde_json::Value = serde_json::from_str(&stdout).expect("JSON on stdout");
    let results = results.as_array().expect("array of results");
    assert_eq!(results.len(), 2);
    // A future timestamp clamps to zero days, so `fresh` is recent.
    assert_eq!(results[0]["contactId"], "fresh");
    assert_eq!(results[0]["category"], "recent");
    assert_eq!(results[1]["contactId"], "quiet");
    assert_eq!(results[1]["category"], "inactive");
    assert_eq!(results[1]["confidenceScore"], 40);
    assert_eq!(results[1]["tags"][0], "internal");
}

#[test]
fn analyze_single_contact_and_output_file() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let input = tmp.path().join("export.json");
    let output = tmp.path().join("out.json");
    std::fs::write(&input, EXPORT).expect("write export");

    rapport(tmp.path())
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .args(["--contact", "quiet", "--batch-size", "1"])
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).expect("output file");
    let result: serde_json::Value = serde_json::from_str(&written).expect("JSON result");
    assert_eq!(result["contactId"], "quiet");
    assert!(result["metrics"]["daysSinceLastContact"].is_null());
}

#[test]
fn analyze_unknown_contact_fails() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let input = tmp.path().join("export.json");
    std::fs::write(&input, EXPORT).expect("write export");

    rapport(tmp.path())
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .args(["--contact", "nobody"])
        .assert()
        .failure();
}

#[test]
fn analyze_rejects_zero_batch_size() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let input = tmp.path().join("export.json");
    std::fs::write(&input, EXPORT).expect("write export");

    rapport(tmp.path())
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .args(["--batch-size", "0"])
        .assert()
        .failure();
}

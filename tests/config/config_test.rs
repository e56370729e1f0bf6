//! Coverage for config parsing, validation and path resolution.

use std::collections::HashMap;

use rapport::batch::BatchOptions;
use rapport::config::{
    config_dir, config_path_with, load_config, BatchConfig, CategoryPolicy, Config, PolicyConfig,
    ScoringPolicy, WindowPolicy, MAX_WINDOW_DAYS,
};

fn parse(toml_str: &str) -> Config {
    match Config::from_toml(toml_str) {
        Ok(config) => config,
        Err(err) => panic!("config should parse: {err:#}"),
    }
}

#[test]
fn default_policy_values() {
    let windows = WindowPolicy::default();
    assert_eq!(windows.recent_days, 30);
    assert_eq!(windows.extended_days, 90);
    assert_eq!(windows.reply_window_days, 14);

    let category = CategoryPolicy::default();
    assert_eq!(category.recent_max_days, 30);
    assert_eq!(category.recent_min_emails_short, 2);
    assert_eq!(category.recent_min_emails_long, 5);
    assert!((category.recent_min_response_rate - 0.2).abs() < f64::EPSILON);
    assert_eq!(category.in_touch_min_emails, 3);
    assert!((category.in_touch_min_response_rate - 0.3).abs() < f64::EPSILON);
    assert_eq!(category.in_touch_max_days, 120);

    let scoring = ScoringPolicy::default();
    assert_eq!(scoring.base, 50);
    assert_eq!(scoring.inactive_adjustment, -10);
}

#[test]
fn default_batch_values() {
    let batch = BatchConfig::default();
    assert_eq!(batch.batch_size, None);
    assert_eq!(batch.max_concurrent_batches, None);
    assert_eq!(batch.chunk_size, 25);
    assert_eq!(batch.interaction_limit, 10_000);
}

#[test]
fn empty_toml_yields_defaults() {
    assert_eq!(parse(""), Config::default());
}

#[test]
fn partial_sections_keep_other_defaults() {
    let config = parse(
        r#"
[batch]
batch_size = 40

[policy.category]
in_touch_max_days = 180

[policy.scoring]
in_touch_adjustment = 8
"#,
    );
    assert_eq!(config.batch.batch_size, Some(40));
    assert_eq!(config.batch.chunk_size, 25);
    assert_eq!(config.policy.category.in_touch_max_days, 180);
    assert_eq!(config.policy.category.recent_max_days, 30);
    assert_eq!(config.policy.scoring.in_touch_adjustment, 8);
    assert_eq!(config.policy.windows, WindowPolicy::default());
}

#[test]
fn zero_chunk_size_is_rejected() {
    let err = Config::from_toml("[batch]\nchunk_size = 0\n");
    assert!(err.is_err());
}

#[test]
fn zero_concurrency_is_rejected() {
    let err = Config::from_toml("[batch]\nmax_concurrent_batches = 0\n");
    assert!(err.is_err());
}

#[test]
fn inverted_windows_are_rejected() {
    let err = Config::from_toml("[policy.windows]\nrecent_days = 120\n");
    let message = match err {
        Ok(_) => panic!("inverted windows should be rejected"),
        Err(err) => format!("{err:#}"),
    };
    assert!(message.contains("extended_days"));
}

#[test]
fn oversized_windows_are_rejected() {
    let err = Config::from_toml(
        "[policy.windows]\nrecent_days = 4000000000\nextended_days = 4000000000\n",
    );
    let message = match err {
        Ok(_) => panic!("oversized windows should be rejected"),
        Err(err) => format!("{err:#}"),
    };
    assert!(message.contains("recent_days"));

    assert!(Config::from_toml("[policy.windows]\nreply_window_days = 40000\n").is_err());
}

#[test]
fn century_windows_are_accepted() {
    let config = parse(&format!(
        "[policy.windows]\nrecent_days = {MAX_WINDOW_DAYS}\nextended_days = {MAX_WINDOW_DAYS}\n"
    ));
    assert_eq!(config.policy.windows.extended_days, MAX_WINDOW_DAYS);
}

#[test]
fn out_of_range_rate_is_rejected() {
    let err = Config::from_toml("[policy.category]\nin_touch_min_response_rate = 1.5\n");
    assert!(err.is_err());
}

#[test]
fn malformed_toml_is_an_error() {
    assert!(Config::from_toml("[batch\nchunk_size = ").is_err());
}

#[test]
fn env_overrides_win_over_file() {
    let mut config = parse("[batch]\nbatch_size = 40\nchunk_size = 10\n");
    let env: HashMap<&str, &str> = HashMap::from([
        ("RAPPORT_BATCH_SIZE", "80"),
        ("RAPPORT_MAX_CONCURRENCY", "3"),
    ]);
    config.apply_overrides(|key| env.get(key).map(|v| (*v).to_owned()));

    assert_eq!(config.batch.batch_size, Some(80));
    assert_eq!(config.batch.max_concurrent_batches, Some(3));
    assert_eq!(config.batch.chunk_size, 10);
}

#[test]
fn missing_file_yields_defaults() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let config = load_config(&tmp.path().join("absent.toml")).expect("defaults");
    assert_eq!(config, Config::default());
}

#[test]
fn file_is_loaded_and_validated() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let good = tmp.path().join("good.toml");
    std::fs::write(&good, "[policy.windows]\nreply_window_days = 7\n").expect("write config");
    let config = load_config(&good).expect("valid config");
    assert_eq!(config.policy.windows.reply_window_days, 7);

    let bad = tmp.path().join("bad.toml");
    std::fs::write(&bad, "[batch]\nchunk_size = 0\n").expect("write config");
    assert!(load_config(&bad).is_err());
}

#[test]
fn env_path_wins() {
    let path = config_path_with(|key| {
        (key == "RAPPORT_CONFIG_PATH").then(|| "/srv/rapport/prod.toml".to_owned())
    });
    assert_eq!(path, std::path::PathBuf::from("/srv/rapport/prod.toml"));
}

#[test]
fn config_dir_resolves() {
    let dir = config_dir();
    assert!(dir.is_ok());
    let path = match dir {
        Ok(path) => path,
        Err(err) => panic!("config dir should resolve: {err}"),
    };
    assert!(path.ends_with(".rapport"));
}

#[test]
fn batch_options_mirror_config() {
    let config = BatchConfig {
        batch_size: Some(12),
        max_concurrent_batches: Some(4),
        chunk_size: 3,
        interaction_limit: 50,
    };
    let options = BatchOptions::from(&config);
    assert_eq!(options.batch_size, Some(12));
    assert_eq!(options.max_concurrent_batches, Some(4));
    assert_eq!(options.chunk_size, 3);
    assert_eq!(BatchOptions::default().chunk_size, 25);
}

#[test]
fn policy_round_trips_through_analyzer() {
    let policy = PolicyConfig {
        windows: WindowPolicy {
            recent_days: 7,
            ..WindowPolicy::default()
        },
        ..PolicyConfig::default()
    };
    let analyzer = rapport::analysis::ContactAnalyzer::new(policy.clone(), chrono::Utc::now());
    assert_eq!(analyzer.policy(), &policy);
}

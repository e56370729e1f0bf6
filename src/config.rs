//! Configuration loading and validation.
//!
//! Loads `rapport.toml` (or `$RAPPORT_CONFIG_PATH`). Every section has
//! defaults, so an absent file yields the built-in policy table.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "rapport.toml";

/// Upper bound for every `[policy.windows]` value (about a century).
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Batch orchestration settings.
    pub batch: BatchConfig,
    /// Engagement policy thresholds.
    pub policy: PolicyConfig,
}

impl Config {
    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or fails validation.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests never touch the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("RAPPORT_BATCH_SIZE") {
            match v.parse() {
                Ok(n) => self.batch.batch_size = Some(n),
                Err(_) => warn_invalid("RAPPORT_BATCH_SIZE", &v),
            }
        }
        if let Some(v) = env("RAPPORT_MAX_CONCURRENCY") {
            match v.parse() {
                Ok(n) => self.batch.max_concurrent_batches = Some(n),
                Err(_) => warn_invalid("RAPPORT_MAX_CONCURRENCY", &v),
            }
        }
        if let Some(v) = env("RAPPORT_CHUNK_SIZE") {
            match v.parse() {
                Ok(n) => self.batch.chunk_size = n,
                Err(_) => warn_invalid("RAPPORT_CHUNK_SIZE", &v),
            }
        }
    }

    /// Reject values that would stall or invert the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch.chunk_size == 0 {
            anyhow::bail!("batch.chunk_size must be at least 1");
        }
        if self.batch.batch_size == Some(0) {
            anyhow::bail!("batch.batch_size must be at least 1");
        }
        if self.batch.max_concurrent_batches == Some(0) {
            anyhow::bail!("batch.max_concurrent_batches must be at least 1");
        }
        let windows = &self.policy.windows;
        for (name, days) in [
            ("recent_days", windows.recent_days),
            ("extended_days", windows.extended_days),
            ("reply_window_days", windows.reply_window_days),
        ] {
            if days > MAX_WINDOW_DAYS {
                anyhow::bail!(
                    "policy.windows.{name} must be at most {MAX_WINDOW_DAYS} days, got {days}"
                );
            }
        }
        if windows.recent_days > windows.extended_days {
            anyhow::bail!(
                "policy.windows.recent_days ({}) exceeds extended_days ({})",
                windows.recent_days,
                windows.extended_days
            );
        }
        for (name, rate) in [
            (
                "recent_min_response_rate",
                self.policy.category.recent_min_response_rate,
            ),
            (
                "in_touch_min_response_rate",
                self.policy.category.in_touch_min_response_rate,
            ),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                anyhow::bail!("policy.category.{name} must be within 0.0..=1.0, got {rate}");
            }
        }
        Ok(())
    }
}

fn warn_invalid(var: &str, value: &str) {
    tracing::warn!(var, value, "ignoring invalid env override");
}

// ── Batch config ────────────────────────────────────────────────

/// Batch orchestration settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Contacts per batch. `None` picks from the recommendation table.
    pub batch_size: Option<usize>,
    /// Batches run concurrently per group. `None` picks from the table.
    pub max_concurrent_batches: Option<usize>,
    /// Contacts analyzed between progress reports inside a batch.
    pub chunk_size: usize,
    /// Maximum interactions requested from the mail source.
    pub interaction_limit: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: None,
            max_concurrent_batches: None,
            chunk_size: 25,
            interaction_limit: 10_000,
        }
    }
}

// ── Policy config ───────────────────────────────────────────────

/// Engagement policy table.
///
/// The defaults are fixed policy values with no documented derivation. They
/// are kept exactly and exposed here so deployments can tune them without
/// touching the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Time windows used by the metrics pass.
    pub windows: WindowPolicy,
    /// Categorizer thresholds.
    pub category: CategoryPolicy,
    /// Confidence scorer weights.
    pub scoring: ScoringPolicy,
}

/// Time windows for counting and reply matching, in days.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowPolicy {
    /// Short activity window.
    pub recent_days: u32,
    /// Long activity window.
    pub extended_days: u32,
    /// A reply later than this does not count as a response.
    pub reply_window_days: u32,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            recent_days: 30,
            extended_days: 90,
            reply_window_days: 14,
        }
    }
}

/// Categorizer thresholds, evaluated in priority order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CategoryPolicy {
    /// `recent` when last contact is at most this many days ago.
    pub recent_max_days: u32,
    /// `recent` when at least this many emails fall in the short window.
    pub recent_min_emails_short: u32,
    /// `recent` when at least this many emails fall in the long window...
    pub recent_min_emails_long: u32,
    /// ...and the response rate is at least this.
    pub recent_min_response_rate: f64,
    /// `in_touch` requires at least this many emails...
    pub in_touch_min_emails: u32,
    /// ...a response rate of at least this...
    pub in_touch_min_response_rate: f64,
    /// ...and last contact at most this many days ago.
    pub in_touch_max_days: u32,
}

impl Default for CategoryPolicy {
    fn default() -> Self {
        Self {
            recent_max_days: 30,
            recent_min_emails_short: 2,
            recent_min_emails_long: 5,
            recent_min_response_rate: 0.2,
            in_touch_min_emails: 3,
            in_touch_min_response_rate: 0.3,
            in_touch_max_days: 120,
        }
    }
}

/// Additive confidence scoring weights.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Starting score.
    pub base: i32,
    /// Volume bonus applies above this many emails.
    pub volume_threshold: u32,
    /// Bonus for exceeding `volume_threshold`.
    pub volume_bonus: i32,
    /// Extra volume bonus applies above this many emails.
    pub high_volume_threshold: u32,
    /// Bonus for exceeding `high_volume_threshold`.
    pub high_volume_bonus: i32,
    /// Freshness bonus applies below this many days since last contact.
    pub fresh_days: u32,
    /// Bonus for contact within `fresh_days`.
    pub fresh_bonus: i32,
    /// Recency bonus applies below this many days since last contact.
    pub recent_days: u32,
    /// Bonus for contact within `recent_days`.
    pub recent_bonus: i32,
    /// Strong response bonus applies above this rate.
    pub strong_response_rate: f64,
    /// Bonus for a rate above `strong_response_rate`.
    pub strong_response_bonus: i32,
    /// Good response bonus applies above this rate.
    pub good_response_rate: f64,
    /// Bonus for a rate above `good_response_rate`.
    pub good_response_bonus: i32,
    /// Adjustment for the `recent` category.
    pub recent_adjustment: i32,
    /// Adjustment for the `in_touch` category.
    pub in_touch_adjustment: i32,
    /// Adjustment for the `inactive` category.
    pub inactive_adjustment: i32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base: 50,
            volume_threshold: 5,
            volume_bonus: 20,
            high_volume_threshold: 10,
            high_volume_bonus: 10,
            fresh_days: 7,
            fresh_bonus: 15,
            recent_days: 30,
            recent_bonus: 10,
            strong_response_rate: 0.7,
            strong_response_bonus: 15,
            good_response_rate: 0.5,
            good_response_bonus: 10,
            recent_adjustment: 10,
            in_touch_adjustment: 5,
            inactive_adjustment: -10,
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────

/// Load config from a TOML file. A missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, parsed, or validated.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            tracing::info!(path = %path.display(), "loading config from file");
            let config: Config = toml::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("invalid config at {}", path.display()))?;
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(anyhow::anyhow!(
            "failed to read config at {}: {e}",
            path.display()
        )),
    }
}

/// Load config from the resolved path and apply env overrides.
///
/// # Errors
///
/// Returns an error if loading fails or the overridden config is invalid.
pub fn load_default_config() -> anyhow::Result<Config> {
    let path = config_path_with(|key| std::env::var(key).ok());
    let mut config = load_config(&path)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Resolve the config path using a custom env resolver.
///
/// `$RAPPORT_CONFIG_PATH` wins, then `./rapport.toml`, then
/// `~/.rapport/rapport.toml`.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(p) = env("RAPPORT_CONFIG_PATH") {
        return PathBuf::from(p);
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    config_dir().map_or(local, |dir| dir.join(CONFIG_FILE_NAME))
}

/// Resolve the per-user config directory (`~/.rapport/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".rapport"))
}

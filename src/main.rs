//! Rapport CLI entry point.
//!
//! `analyze` runs the full pipeline over an exported snapshot; `plan` prints
//! the batch sizing the coordinator would pick for a contact count.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use rapport::analysis::ContactAnalyzer;
use rapport::batch::{AnalysisRequest, BatchCoordinator, BatchOptions, BatchPlan, ResultCache};
use rapport::config::{self, Config};
use rapport::progress::ProgressTracker;
use rapport::source::{JsonExport, MailSource, SegmentSource};
use rapport::types::{AnalysisResult, Category};

/// Rapport: contact engagement analysis.
#[derive(Parser)]
#[command(name = "rapport", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Analyze every contact in an exported snapshot.
    Analyze {
        /// JSON export with `contacts`, `interactions` and `segments`.
        #[arg(long)]
        input: PathBuf,
        /// Config file (defaults to `$RAPPORT_CONFIG_PATH` or `./rapport.toml`).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write results here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print only this contact's result.
        #[arg(long)]
        contact: Option<String>,
        /// Also write JSON logs to this directory.
        #[arg(long)]
        json_logs: Option<PathBuf>,
        /// Override contacts per batch.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Override concurrent batches per group.
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Show the batch plan for a contact count.
    Plan {
        /// Number of contacts.
        count: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze {
            input,
            config,
            output,
            contact,
            json_logs,
            batch_size,
            concurrency,
        } => {
            let _logging_guard = match json_logs {
                Some(dir) => Some(rapport::logging::init_json_file(&dir, "info")?),
                None => {
                    rapport::logging::init_cli("info");
                    None
                }
            };
            let mut config = resolve_config(config.as_deref())?;
            if batch_size.is_some() {
                config.batch.batch_size = batch_size;
            }
            if concurrency.is_some() {
                config.batch.max_concurrent_batches = concurrency;
            }
            config.validate().context("invalid batch overrides")?;
            handle_analyze(&input, &config, output.as_deref(), contact.as_deref()).await
        }
        Command::Plan { count } => {
            handle_plan(count);
            Ok(())
        }
    }
}

fn resolve_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let mut config = config::load_config(path)?;
            config.apply_overrides(|key| std::env::var(key).ok());
            config.validate()?;
            Ok(config)
        }
        None => config::load_default_config(),
    }
}

/// Run the pipeline over an export and print or write the results.
async fn handle_analyze(
    input: &Path,
    config: &Config,
    output: Option<&Path>,
    contact: Option<&str>,
) -> anyhow::Result<()> {
    let export = JsonExport::load(input)
        .await
        .with_context(|| format!("failed to load export {}", input.display()))?;
    let contacts = export.contacts().await?;
    let interactions = export.interactions(config.batch.interaction_limit).await?;

    let request = AnalysisRequest {
        contacts,
        interactions,
        segments: export.segment_tags(),
        options: BatchOptions::from(&config.batch),
    };

    let analyzer = ContactAnalyzer::new(config.policy.clone(), Utc::now());
    info!(as_of = %analyzer.as_of(), "analyzing against reference time");
    let coordinator = BatchCoordinator::new(Arc::new(analyzer));
    let mut tracker = ProgressTracker::new().with_progress(|event| {
        info!(
            stage = %event.stage,
            progress = event.progress,
            eta_seconds = ?event.eta_seconds,
            processed = event.items_processed,
            total = event.total_items,
            "{}",
            event.message
        );
    });

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling analysis");
            ctrl_c_token.cancel();
        }
    });

    let mut cache = ResultCache::new();
    let results = coordinator
        .analyze_all_cached(request, &mut tracker, &cancel, &mut cache)
        .await
        .context("analysis failed")?;
    log_summary(&results);

    let json = match contact {
        Some(id) => {
            let result = cache
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("contact {id} not found in export"))?;
            serde_json::to_string_pretty(result)?
        }
        None => serde_json::to_string_pretty(&results)?,
    };

    match output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "results written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn log_summary(results: &[AnalysisResult]) {
    let count = |category: Category| results.iter().filter(|r| r.category == category).count();
    info!(
        total = results.len(),
        recent = count(Category::Recent),
        in_touch = count(Category::InTouch),
        inactive = count(Category::Inactive),
        "analysis complete"
    );
}

/// Print the recommended sizing for `count` contacts.
fn handle_plan(count: usize) {
    let plan = BatchPlan::for_contacts(count, &BatchOptions::default());
    println!("contacts:    {count}");
    println!("batch size:  {}", plan.batch_size);
    println!("concurrency: {}", plan.concurrency);
    println!("batches:     {}", plan.batch_count);
}

//! # strata-archive
//!
//! One-pass archival CLI.
//!
//! Reads a JSON batch of wire records, windows them per entity, and persists
//! the compiled artifacts. Without `--output-dir` the artifacts land in an
//! in-memory store and the pass is effectively a dry run that still reports
//! per-window outcomes.
//!
//! ## Usage
//!
//! ```bash
//! # Dry run against an exported batch
//! strata-archive --input batch.json
//!
//! # Archive into a local object store layout
//! strata-archive --input batch.json --output-dir /var/lib/strata
//!
//! # Narrower windows, lower fan-out
//! strata-archive --input batch.json --window-secs 60 --concurrency 4
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use strata_archiver::{ArchiveCoordinator, ArchiverConfig, JsonFileSource, WindowOutcome};
use strata_core::{init_logging, LogFormat, MemorySink, ObjectStoreSink};

/// Windowed archival of time-series monitoring samples.
#[derive(Debug, Parser)]
#[command(name = "strata-archive")]
#[command(about = "Archives monitoring samples into per-window artifacts")]
#[command(version)]
struct Args {
    /// Path to a JSON array of wire records.
    #[arg(long, env = "STRATA_INPUT")]
    input: PathBuf,

    /// Directory to persist artifacts under; in-memory (dry run) if omitted.
    #[arg(long, env = "STRATA_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Window duration in seconds.
    #[arg(
        long,
        env = "STRATA_WINDOW_SECS",
        default_value = "300",
        value_parser = clap::value_parser!(i64).range(1..)
    )]
    window_secs: i64,

    /// Maximum concurrently in-flight persist calls.
    #[arg(long, env = "STRATA_CONCURRENCY", default_value = "16")]
    concurrency: usize,

    /// Only archive records older than this instant (RFC 3339); now if omitted.
    #[arg(long, env = "STRATA_CUTOFF")]
    cutoff: Option<DateTime<Utc>>,

    /// Emit JSON logs instead of pretty-printed ones.
    #[arg(long, env = "STRATA_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(if args.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    let config = ArchiverConfig {
        window_duration: chrono::Duration::seconds(args.window_secs),
        max_concurrent_persists: args.concurrency,
    };
    let cutoff = args.cutoff.unwrap_or_else(Utc::now);
    let source = JsonFileSource::new(&args.input);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight windows");
            ctrl_c_cancel.cancel();
        }
    });

    let result = match args.output_dir {
        Some(dir) => {
            let store = object_store::local::LocalFileSystem::new_with_prefix(&dir)
                .with_context(|| format!("failed to open output dir {}", dir.display()))?;
            let sink = Arc::new(ObjectStoreSink::new(Arc::new(store)));
            let coordinator = ArchiveCoordinator::new(sink, config);
            coordinator.run(&source, cutoff, &cancel).await?
        }
        None => {
            info!("no output dir configured, running against an in-memory sink");
            let sink = Arc::new(MemorySink::new());
            let coordinator = ArchiveCoordinator::new(sink, config);
            coordinator.run(&source, cutoff, &cancel).await?
        }
    };

    for entity in &result.entities {
        if let Some(error) = &entity.plan_error {
            warn!(entity = %entity.entity_id, %error, "window planning failed");
        }
        if entity.records_rejected > 0 {
            warn!(
                entity = %entity.entity_id,
                rejected = entity.records_rejected,
                message = entity.rejection_message.as_deref().unwrap_or_default(),
                "records rejected during validation"
            );
        }
        for outcome in &entity.outcomes {
            if let WindowOutcome::Failed { window, error } = outcome {
                warn!(entity = %entity.entity_id, %window, %error, "window failed");
            }
        }
    }
    info!(
        run_id = %result.run_id,
        entities = result.entities.len(),
        persisted = result.persisted_count(),
        failed = result.failure_count(),
        cancelled = result.cancelled_count(),
        "archive run complete"
    );

    // Plan-level failures and rejected records produce no window outcomes;
    // the completeness check covers them as well as failed persists.
    if !result.is_complete() {
        let rejected: usize = result.entities.iter().map(|e| e.records_rejected).sum();
        let plan_errors = result
            .entities
            .iter()
            .filter(|e| e.plan_error.is_some())
            .count();
        anyhow::bail!(
            "archive pass incomplete: {} window(s) failed, {} entity plan error(s), {} record(s) rejected",
            result.failure_count(),
            plan_errors,
            rejected
        );
    }
    Ok(())
}

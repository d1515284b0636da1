//! The archive coordinator: batch in, consolidated result out.
//!
//! One pass moves through `Fetched → Grouped → {per entity: Planned →
//! Assigned → Compiled → Persisted} → Done`. Entities fan out onto spawned
//! tasks; windows fan out concurrently inside each entity task. Both tiers
//! share one semaphore so a large batch cannot open an unbounded number of
//! in-flight persists. No ordering is required between concurrent tasks;
//! outcomes are merged after each join and sorted for deterministic reports.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use strata_core::observability::archive_span;
use strata_core::{
    assign, compile, group_by_entity, plan, ArchiveRunId, ArtifactKey, ArtifactSink, Record,
    Result, Window, WindowBucket, WireRecord,
};

use crate::result::{ArchiveResult, EntityReport, WindowOutcome};
use crate::source::RecordSource;

/// Configuration for one coordinator instance.
///
/// Passed in at construction so the pipeline is testable with arbitrary
/// durations; nothing here is a process-wide literal.
#[derive(Debug, Clone, Copy)]
pub struct ArchiverConfig {
    /// Fixed width of every archive window.
    pub window_duration: chrono::Duration,
    /// Upper bound on concurrently in-flight persist calls, across all
    /// entities and windows of the pass.
    pub max_concurrent_persists: usize,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            window_duration: chrono::Duration::minutes(5),
            max_concurrent_persists: 16,
        }
    }
}

/// Orchestrates one archive pass over a record batch.
pub struct ArchiveCoordinator<S: ArtifactSink> {
    sink: Arc<S>,
    config: ArchiverConfig,
}

impl<S: ArtifactSink> ArchiveCoordinator<S> {
    /// Creates a coordinator writing to the given sink.
    #[must_use]
    pub fn new(sink: Arc<S>, config: ArchiverConfig) -> Self {
        Self { sink, config }
    }

    /// Fetches records older than `cutoff` from the source and archives them.
    ///
    /// # Errors
    ///
    /// Returns [`strata_core::Error::Source`] if the fetch fails; sink and
    /// per-record failures are aggregated into the result instead.
    pub async fn run(
        &self,
        source: &dyn RecordSource,
        cutoff: chrono::DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<ArchiveResult> {
        let batch = source.fetch_since(cutoff).await?;
        Ok(self.archive(batch, cancel).await)
    }

    /// Archives one flat batch of wire records.
    ///
    /// Never fails as a whole: every failure is local to one record, window,
    /// or entity, and is reported in the result. An empty batch yields an
    /// empty result.
    pub async fn archive(
        &self,
        batch: Vec<WireRecord>,
        cancel: &CancellationToken,
    ) -> ArchiveResult {
        let run_id = ArchiveRunId::generate();
        let started_at = Utc::now();
        info!(%run_id, records = batch.len(), "starting archive pass");

        let mut grouped = group_by_entity(batch);
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_persists));

        // Entities whose every record was rejected still need a report.
        let mut entity_ids: Vec<String> = grouped
            .entities
            .keys()
            .chain(grouped.rejected.keys())
            .cloned()
            .collect();
        entity_ids.sort();
        entity_ids.dedup();

        let mut tasks: JoinSet<EntityReport> = JoinSet::new();
        for entity_id in entity_ids {
            let records = grouped.entities.remove(&entity_id).unwrap_or_default();
            let records_rejected = grouped.rejected.remove(&entity_id).unwrap_or(0);
            let rejection_message = grouped.rejection_messages.remove(&entity_id);
            let sink = Arc::clone(&self.sink);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let config = self.config;

            tasks.spawn(async move {
                archive_entity(
                    entity_id,
                    records,
                    records_rejected,
                    rejection_message,
                    config,
                    sink,
                    semaphore,
                    cancel,
                )
                .await
            });
        }

        let mut entities = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => entities.push(report),
                // Pipeline stages are non-panicking; reaching this means a
                // task was torn down underneath us.
                Err(join_err) => error!(%run_id, error = %join_err, "entity task aborted"),
            }
        }
        entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

        let result = ArchiveResult {
            run_id,
            started_at,
            entities,
        };
        info!(
            %run_id,
            persisted = result.persisted_count(),
            failed = result.failure_count(),
            cancelled = result.cancelled_count(),
            "archive pass finished"
        );
        result
    }
}

/// Plans, assigns, compiles, and persists one entity's records.
#[allow(clippy::too_many_arguments)]
async fn archive_entity<S: ArtifactSink>(
    entity_id: String,
    records: Vec<Record>,
    records_rejected: usize,
    rejection_message: Option<String>,
    config: ArchiverConfig,
    sink: Arc<S>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> EntityReport {
    let mut report = EntityReport {
        entity_id: entity_id.clone(),
        windows_planned: 0,
        windows_attempted: 0,
        windows_succeeded: 0,
        outcomes: Vec::new(),
        records_rejected,
        rejection_message,
        plan_error: None,
    };
    if records.is_empty() {
        // Every record for this entity was rejected during validation.
        return report;
    }

    let owner_id = records[0].owner_id.clone();
    let span = archive_span("archive_entity", &owner_id, &entity_id);

    // Planning and assignment are pure and synchronous; the span guard must
    // not be held across the awaits below.
    let planned = {
        let _guard = span.enter();
        plan(&records, config.window_duration).and_then(|windows| assign(&records, &windows))
    };
    let buckets = match planned {
        Ok(buckets) => buckets,
        Err(err) => {
            error!(entity = %entity_id, error = %err, "window planning failed");
            report.plan_error = Some(err.to_string());
            return report;
        }
    };
    report.windows_planned = buckets.len();

    // Windows fan out concurrently; the shared semaphore bounds how many
    // persists are actually in flight across the whole pass.
    let mut persists = Vec::new();
    for bucket in buckets {
        if bucket.records.is_empty() {
            continue;
        }
        report.windows_attempted += 1;
        persists.push(persist_window(
            bucket,
            Arc::clone(&sink),
            Arc::clone(&semaphore),
            cancel.clone(),
        ));
    }
    let mut outcomes = join_window_tasks(persists).await;
    outcomes.sort_by_key(|o| o.window().start);

    report.windows_succeeded = outcomes.iter().filter(|o| o.is_persisted()).count();
    report.outcomes = outcomes;
    info!(
        entity = %entity_id,
        planned = report.windows_planned,
        attempted = report.windows_attempted,
        succeeded = report.windows_succeeded,
        "entity archived"
    );
    report
}

/// Compiles one non-empty window and hands the artifact to the sink.
async fn persist_window<S: ArtifactSink>(
    bucket: WindowBucket,
    sink: Arc<S>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> WindowOutcome {
    let window = bucket.window;

    let permit = tokio::select! {
        () = cancel.cancelled() => return WindowOutcome::Cancelled { window },
        permit = semaphore.acquire_owned() => permit,
    };
    let Ok(_permit) = permit else {
        return failed(window, "persist semaphore closed");
    };
    if cancel.is_cancelled() {
        return WindowOutcome::Cancelled { window };
    }

    let Some(compiled) = compile(&window, &bucket.records) else {
        // Unreachable for the buckets we are given; compile owns the policy.
        return failed(window, "empty window submitted for compilation");
    };
    if compiled.owner_conflict {
        warn!(
            entity = %compiled.artifact.entity_id,
            owner = %compiled.artifact.owner_id,
            window = %window,
            "records disagree on owner; keeping the first record's owner"
        );
    }

    let key = ArtifactKey::derive(
        &compiled.artifact.owner_id,
        &compiled.artifact.entity_id,
        window.start,
    );
    let put = tokio::select! {
        () = cancel.cancelled() => return WindowOutcome::Cancelled { window },
        result = sink.put(&key, &compiled.artifact) => result,
    };
    match put {
        Ok(()) => {
            info!(
                entity = %compiled.artifact.entity_id,
                key = %key,
                entries = compiled.artifact.entries.len(),
                "window persisted"
            );
            WindowOutcome::Persisted {
                window,
                key,
                owner_conflict: compiled.owner_conflict,
            }
        }
        Err(err) => {
            error!(
                entity = %compiled.artifact.entity_id,
                key = %key,
                error = %err,
                "window persist failed"
            );
            WindowOutcome::Failed {
                window,
                error: strata_core::error::render_brief(&err),
            }
        }
    }
}

fn failed(window: Window, message: &str) -> WindowOutcome {
    WindowOutcome::Failed {
        window,
        error: message.to_string(),
    }
}

/// Spawns the window futures as tasks and joins them all.
///
/// Completion order is not preserved; the caller sorts outcomes by window.
async fn join_window_tasks<F>(futures: Vec<F>) -> Vec<WindowOutcome>
where
    F: std::future::Future<Output = WindowOutcome> + Send + 'static,
{
    let mut set = JoinSet::new();
    for future in futures {
        set.spawn(future);
    }
    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        if let Ok(outcome) = joined {
            outcomes.push(outcome);
        }
    }
    outcomes
}

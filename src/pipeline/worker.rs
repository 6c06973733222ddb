//! Enrichment worker pool.
//!
//! Workers are fully independent: they share nothing but the queue and
//! the store. Each consumed task is re-checked against the profile's
//! current state first, which makes duplicate deliveries (the price of
//! at-least-once) harmless. The generation call runs under a timeout; a
//! timeout is a failed attempt, not a crash. Transient failures sleep an
//! exponential backoff while the claim is still held, then release the
//! profile back to `Pending` for re-dispatch with the attempt count
//! persisted, or park it in terminal `Failed` once the ceiling is hit.

use crate::config::EnrichmentConfig;
use crate::pipeline::{ContextBuilder, SummarizeError, Summarizer, Task, TaskPayload, TaskQueue};
use crate::storage::ProfileStore;
use crate::{EnrichmentState, ProfileId};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

pub struct WorkerPool {
    shared: WorkerShared,
    workers: usize,
}

#[derive(Clone)]
struct WorkerShared {
    store: Arc<dyn ProfileStore>,
    queue: Arc<dyn TaskQueue>,
    summarizer: Arc<dyn Summarizer>,
    context: Arc<ContextBuilder>,
    config: EnrichmentConfig,
}

impl WorkerPool {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        queue: Arc<dyn TaskQueue>,
        summarizer: Arc<dyn Summarizer>,
        context: Arc<ContextBuilder>,
        config: EnrichmentConfig,
    ) -> Self {
        let workers = config.workers.max(1);
        Self {
            shared: WorkerShared {
                store,
                queue,
                summarizer,
                context,
                config,
            },
            workers,
        }
    }

    /// Spawn the workers; they run until the token is cancelled.
    pub fn spawn(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        (0..self.workers)
            .map(|worker| {
                let shared = self.shared.clone();
                let cancel = cancel.clone();
                tokio::spawn(worker_loop(worker, shared, cancel))
            })
            .collect()
    }

    /// Run workers until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        for handle in self.spawn(cancel) {
            let _ = handle.await;
        }
    }

    /// Run workers until the queue has no outstanding deliveries, then
    /// stop them. Profiles released for retry are *not* re-consumed here;
    /// they wait for the next dispatch cycle.
    pub async fn run_until_idle(&self) {
        let cancel = CancellationToken::new();
        let handles = self.spawn(cancel.clone());

        while self.shared.queue.outstanding() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cancel.cancel();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(worker: usize, shared: WorkerShared, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        match shared.queue.consume() {
            Some(delivery) => {
                handle_delivery(&shared, &delivery.task).await;
                shared.queue.ack(delivery.id);
            }
            None => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }
            }
        }
    }
    tracing::debug!("Worker {worker} stopped");
}

async fn handle_delivery(shared: &WorkerShared, task: &Task) {
    let id = task.payload.profile_id();
    let Some(profile) = shared.store.get(id) else {
        tracing::warn!("Task references missing profile {}; skipping", id.value());
        return;
    };

    match profile.enrichment.state {
        // Duplicate delivery of finished work: no-op, summary untouched.
        EnrichmentState::Done => return,
        EnrichmentState::InProgress => {}
        // Stale delivery: the claim was already released or parked; the
        // dispatcher owns any re-claim.
        EnrichmentState::Pending | EnrichmentState::Failed => return,
    }

    let request = match task.payload {
        TaskPayload::ProfileSummary { .. } => shared.context.build_unit(&profile),
        TaskPayload::DirectorySummary { .. } => shared.context.build_directory(&profile),
    };

    let timeout = Duration::from_millis(shared.config.call_timeout_ms);
    let outcome = tokio::time::timeout(timeout, shared.summarizer.generate(request)).await;

    match outcome {
        Ok(Ok(summary)) => {
            if let Err(e) = shared.store.complete(id, summary) {
                tracing::warn!("Failed to persist summary for {}: {e}", id.value());
            }
        }
        Ok(Err(SummarizeError::Permanent(reason))) => {
            tracing::warn!("Permanent enrichment failure for {}: {reason}", id.value());
            if let Err(e) = shared.store.fail(id, &reason) {
                tracing::warn!("Failed to record failure for {}: {e}", id.value());
            }
        }
        Ok(Err(SummarizeError::Transient(reason))) => {
            release_for_retry(shared, id, &reason, profile.enrichment.attempts).await;
        }
        Err(_) => {
            release_for_retry(
                shared,
                id,
                "generation call timed out",
                profile.enrichment.attempts,
            )
            .await;
        }
    }
}

/// Sleep the backoff while the claim is still held, then persist the
/// attempt and release the profile for re-dispatch (or park it).
async fn release_for_retry(shared: &WorkerShared, id: ProfileId, reason: &str, prior_attempts: u32) {
    tokio::time::sleep(backoff_delay(prior_attempts, &shared.config)).await;

    match shared
        .store
        .record_failure(id, reason, shared.config.max_attempts)
    {
        Ok(EnrichmentState::Failed) => {
            tracing::warn!(
                "Profile {} failed terminally after {} attempts: {reason}",
                id.value(),
                shared.config.max_attempts
            );
        }
        Ok(_) => {
            tracing::debug!("Profile {} released for retry: {reason}", id.value());
        }
        Err(e) => {
            tracing::warn!("Failed to record attempt for {}: {e}", id.value());
        }
    }
}

/// Exponential backoff from the persisted attempt count, capped.
fn backoff_delay(attempt: u32, config: &EnrichmentConfig) -> Duration {
    let factor = 1u64 << attempt.min(20);
    let millis = config
        .base_backoff_ms
        .saturating_mul(factor)
        .min(config.max_backoff_ms);
    Duration::from_millis(millis)
}

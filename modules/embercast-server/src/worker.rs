//! Queue worker loop: claim → dispatch → complete or retry. Multiple loops
//! run per process and across replicas; exclusivity comes from the claim's
//! lease, not from anything in here.
//!
//! Shutdown is checked between tasks only — in-flight dispatch always runs
//! to completion and records its outcome before the loop exits.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use embercast_core::ServerDeps;
use embercast_domains::momentum::activities::run_momentum_cycle;
use embercast_domains::publishing::activities::{execute_publish, PublishOutcome};
use embercast_domains::publishing::outcome::FailureKind;
use embercast_domains::shared::tasks::{Task, TaskPayload, KIND_MOMENTUM, KIND_PUBLISH};

const IDLE_POLL: Duration = Duration::from_secs(2);

pub async fn run_worker(deps: ServerDeps, worker_id: String, mut shutdown: watch::Receiver<bool>) {
    info!(worker_id = %worker_id, "Worker started");
    while !*shutdown.borrow() {
        match Task::claim(&[KIND_PUBLISH, KIND_MOMENTUM], &worker_id, deps.pool()).await {
            Ok(Some(task)) => {
                if let Err(e) = dispatch(&deps, &task).await {
                    warn!(task_id = task.id, kind = %task.kind, error = %e, "Task dispatch failed");
                    if let Err(e) = task.retry_later(deps.pool()).await {
                        warn!(task_id = task.id, error = %e, "Failed to release task for retry");
                    }
                }
            }
            Ok(None) => idle(&mut shutdown).await,
            Err(e) => {
                warn!(worker_id = %worker_id, error = %e, "Task claim failed");
                idle(&mut shutdown).await;
            }
        }
    }
    info!(worker_id = %worker_id, "Worker stopped");
}

async fn idle(shutdown: &mut watch::Receiver<bool>) {
    tokio::select! {
        _ = shutdown.changed() => {}
        _ = tokio::time::sleep(IDLE_POLL) => {}
    }
}

async fn dispatch(deps: &ServerDeps, task: &Task) -> anyhow::Result<()> {
    let payload = match task.decode() {
        Ok(payload) => payload,
        Err(e) => {
            // Undecodable payloads never get better; dead-letter immediately.
            warn!(task_id = task.id, kind = %task.kind, error = %e, "Undecodable task payload, dead-lettering");
            return Task::complete(task.id, deps.pool()).await;
        }
    };

    match payload {
        TaskPayload::Publish {
            schedule_entry_id,
            approved_content_id,
            tenant_id,
        } => {
            let outcome =
                execute_publish(deps, schedule_entry_id, approved_content_id, tenant_id).await?;
            match outcome {
                // Only transient failures go back through queue backoff;
                // every other outcome is terminal for this task.
                PublishOutcome::Failed(FailureKind::Transient) => {
                    task.retry_later(deps.pool()).await
                }
                _ => Task::complete(task.id, deps.pool()).await,
            }
        }
        TaskPayload::Momentum { tenant_id } => {
            run_momentum_cycle(deps, tenant_id).await?;
            Task::complete(task.id, deps.pool()).await
        }
    }
}

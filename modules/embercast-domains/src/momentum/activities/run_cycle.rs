//! One momentum computation cycle for a tenant: cluster stray signals,
//! refresh correlation edges, overwrite per-topic snapshots, and queue
//! action entries for anything that crossed the hotness threshold.

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use embercast_core::ServerDeps;

use crate::content::models::Signal;
use crate::momentum::models::{
    ActionQueueEntry, CorrelationEdge, MomentumSnapshot, TopicCluster,
};
use crate::momentum::score::{score, MomentumInputs};
use crate::shared::tasks::{Task, TaskPayload};
use crate::shared::tenants::Tenant;

#[derive(Debug, Default, Clone)]
pub struct MomentumStats {
    pub topics_scored: usize,
    pub signals_clustered: u64,
    pub edges_updated: usize,
    pub actions_queued: usize,
}

pub async fn run_momentum_cycle(deps: &ServerDeps, tenant_id: Uuid) -> Result<MomentumStats> {
    let pool = deps.pool();
    let mut stats = MomentumStats::default();

    // Stray signals land in the tenant's default cluster before scoring.
    let default_cluster = TopicCluster::default_for_tenant(tenant_id, pool).await?;
    stats.signals_clustered = Signal::assign_unclustered(tenant_id, default_cluster.id, pool).await?;

    let topics = TopicCluster::for_tenant(tenant_id, pool).await?;
    for topic in &topics {
        match score_topic(deps, tenant_id, topic.id, &mut stats).await {
            Ok(()) => stats.topics_scored += 1,
            Err(e) => warn!(
                tenant_id = %tenant_id,
                topic_id = %topic.id,
                error = %e,
                "Failed to score topic, continuing cycle"
            ),
        }
    }

    info!(
        tenant_id = %tenant_id,
        topics_scored = stats.topics_scored,
        signals_clustered = stats.signals_clustered,
        edges_updated = stats.edges_updated,
        actions_queued = stats.actions_queued,
        "Momentum cycle complete"
    );
    Ok(stats)
}

async fn score_topic(
    deps: &ServerDeps,
    tenant_id: Uuid,
    topic_id: Uuid,
    stats: &mut MomentumStats,
) -> Result<()> {
    let pool = deps.pool();
    let now = Utc::now();
    let window_hours = deps.config.momentum_window_hours;
    let window = Duration::seconds((window_hours * 3600.0) as i64);

    let window_start = now - window;
    let previous_start = window_start - window;

    let current = Signal::window_stats(topic_id, window_start, now, pool).await?;
    let previous_count = Signal::count_in_window(topic_id, previous_start, window_start, pool).await?;
    let previous_velocity = MomentumSnapshot::find(topic_id, pool)
        .await?
        .map(|s| s.velocity)
        .unwrap_or(0.0);

    // Fold this window's per-source activity into the correlation edges.
    let source_counts = Signal::source_counts_in_window(topic_id, window_start, now, pool).await?;
    for sc in &source_counts {
        let share = if current.signal_count > 0 {
            sc.occurrences as f64 / current.signal_count as f64
        } else {
            0.0
        };
        CorrelationEdge::upsert_observation(
            topic_id,
            &sc.source_ref,
            share,
            sc.occurrences,
            sc.last_seen,
            pool,
        )
        .await?;
        stats.edges_updated += 1;
    }

    // Confidence input: mean signal confidence in the window, blended
    // equal-parts with mean edge strength when edges exist.
    let signal_confidence = current.avg_confidence.unwrap_or(0.0);
    let avg_confidence = match CorrelationEdge::mean_strength(topic_id, pool).await? {
        Some(edge_strength) => (signal_confidence + edge_strength) / 2.0,
        None => signal_confidence,
    };

    let components = score(
        &MomentumInputs {
            current_count: current.signal_count,
            previous_count,
            previous_velocity,
            window_hours,
            unique_sources: current.unique_sources,
            total_occurrences: current.signal_count,
            latest_signal_at: current.latest_observed_at,
            avg_confidence,
        },
        now,
    );

    let snapshot = MomentumSnapshot::upsert(
        topic_id,
        tenant_id,
        &components,
        current.signal_count,
        previous_count,
        now,
        pool,
    )
    .await?;

    if snapshot.hot_score >= deps.config.hot_score_threshold {
        if let Some(entry) = ActionQueueEntry::insert_pending(&snapshot, pool).await? {
            stats.actions_queued += 1;
            info!(
                tenant_id = %tenant_id,
                topic_id = %topic_id,
                entry_id = %entry.id,
                hot_score = snapshot.hot_score,
                "Hot topic queued for review"
            );
        }
    }

    Ok(())
}

/// Enqueue one momentum task per non-paused tenant, skipping tenants that
/// already have one waiting. Driven by the momentum ticker in the server.
pub async fn enqueue_momentum_tasks(deps: &ServerDeps) -> Result<usize> {
    let pool = deps.pool();
    let mut enqueued = 0;
    for tenant_id in Tenant::active_ids(pool).await? {
        if Task::momentum_task_exists(tenant_id, pool).await? {
            continue;
        }
        Task::enqueue(
            &TaskPayload::Momentum { tenant_id },
            Utc::now(),
            deps.config.queue_max_attempts,
            pool,
        )
        .await?;
        enqueued += 1;
    }
    Ok(enqueued)
}

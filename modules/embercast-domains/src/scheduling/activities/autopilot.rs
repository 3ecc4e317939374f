//! Auto-scheduler tick. Best-effort by design: the data-model invariant on
//! schedule entries is what prevents double-scheduling across replicas, the
//! tick just decides whether this minute is a posting slot.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use embercast_core::ServerDeps;

use crate::content::models::ContentItem;
use crate::scheduling::activities::schedule_content::{schedule_content, ScheduleError};
use crate::scheduling::models::{AutoScheduleSettings, ScheduleEntry};
use crate::scheduling::slots::{
    local_day_bounds, local_minute_bounds, local_slot, matches_slot, parse_timezone,
};
use crate::shared::tenants::Tenant;

#[derive(Debug, Default, Clone)]
pub struct TickStats {
    pub tenants_considered: usize,
    pub scheduled: usize,
    pub skipped_no_slot: usize,
    pub skipped_quota: usize,
    pub skipped_no_content: usize,
}

pub async fn autopilot_tick(deps: &ServerDeps) -> Result<TickStats> {
    let pool = deps.pool();
    let mut stats = TickStats::default();

    for settings in AutoScheduleSettings::enabled(pool).await? {
        stats.tenants_considered += 1;
        if let Err(e) = tick_tenant(deps, &settings, &mut stats).await {
            warn!(
                tenant_id = %settings.tenant_id,
                error = %e,
                "Autopilot failed for tenant, continuing tick"
            );
        }
    }

    if stats.scheduled > 0 {
        info!(
            tenants = stats.tenants_considered,
            scheduled = stats.scheduled,
            skipped_quota = stats.skipped_quota,
            skipped_no_content = stats.skipped_no_content,
            "Autopilot tick complete"
        );
    }
    Ok(stats)
}

async fn tick_tenant(
    deps: &ServerDeps,
    settings: &AutoScheduleSettings,
    stats: &mut TickStats,
) -> Result<()> {
    let pool = deps.pool();
    let tenant_id = settings.tenant_id;

    if Tenant::is_paused(tenant_id, pool).await? {
        return Ok(());
    }

    let now = Utc::now();
    let tz = parse_timezone(&settings.timezone)?;
    let slot = local_slot(now, tz);

    if !matches_slot(&slot, &settings.days_of_week, &settings.preferred_times) {
        stats.skipped_no_slot += 1;
        return Ok(());
    }

    // Daily quota counts entries in the tenant-local calendar day.
    let (day_start, day_end) = local_day_bounds(slot.date, tz)?;
    let today = ScheduleEntry::count_created_between(tenant_id, day_start, day_end, pool).await?;
    if today >= settings.posts_per_day as i64 {
        stats.skipped_quota += 1;
        return Ok(());
    }

    // A second tick landing in the same minute matches the same slot; one
    // post per matched minute.
    let (minute_start, minute_end) = local_minute_bounds(now, tz)?;
    if ScheduleEntry::count_created_between(tenant_id, minute_start, minute_end, pool).await? > 0 {
        return Ok(());
    }

    let Some(content) = ContentItem::next_auto_schedulable(tenant_id, pool).await? else {
        stats.skipped_no_content += 1;
        return Ok(());
    };

    match schedule_content(deps, tenant_id, content.id, now).await {
        Ok(entry) => {
            stats.scheduled += 1;
            info!(
                tenant_id = %tenant_id,
                content_id = %content.id,
                entry_id = %entry.id,
                slot = %slot.hhmm,
                "Autopilot scheduled content"
            );
        }
        // Raced with another replica or a manual schedule; the invariant held.
        Err(ScheduleError::AlreadyPublished) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

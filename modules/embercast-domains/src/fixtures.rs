//! Seeded fixtures and a scripted fake platform for integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use embercast_core::{
    AppConfig, ContentStatus, Credential, PlatformClient, PlatformRegistry, PlatformResponse,
    RefreshedTokens, RenderedPost, ServerDeps,
};

use crate::content::models::ContentItem;
use crate::publishing::adapters::PROVIDER_LINKEDIN;
use crate::publishing::models::PlatformCredential;
use crate::shared::tenants::Tenant;

pub const TEST_SEALING_KEY: &str = "test-sealing-key";

/// A scripted platform. `push_response` queues the next publish result;
/// unscripted publishes succeed with a generated post ref.
#[derive(Default)]
pub struct FakePlatform {
    responses: Mutex<VecDeque<PlatformResponse>>,
    publishes: Mutex<Vec<RenderedPost>>,
    deletes: Mutex<Vec<String>>,
    refreshes: Mutex<u32>,
    fail_deletes: Mutex<bool>,
}

impl FakePlatform {
    pub fn push_response(&self, resp: PlatformResponse) {
        self.responses.lock().unwrap().push_back(resp);
    }

    pub fn publish_calls(&self) -> usize {
        self.publishes.lock().unwrap().len()
    }

    pub fn deleted_refs(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn refresh_calls(&self) -> u32 {
        *self.refreshes.lock().unwrap()
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        *self.fail_deletes.lock().unwrap() = fail;
    }

    pub fn success_response(post_ref: &str) -> PlatformResponse {
        PlatformResponse {
            success: true,
            status: Some(201),
            post_ref: Some(post_ref.to_string()),
            post_url: Some(format!("https://www.linkedin.com/feed/update/{post_ref}/")),
            ..Default::default()
        }
    }

    pub fn failure_response(status: u16, error: &str) -> PlatformResponse {
        PlatformResponse {
            success: false,
            status: Some(status),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn publish(&self, post: &RenderedPost, _credential: &Credential) -> PlatformResponse {
        self.publishes.lock().unwrap().push(post.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::success_response(&format!("urn:li:share:{}", Uuid::new_v4())))
    }

    async fn delete_post(&self, post_ref: &str, _credential: &Credential) -> Result<()> {
        if *self.fail_deletes.lock().unwrap() {
            return Err(anyhow!("platform delete refused"));
        }
        self.deletes.lock().unwrap().push(post_ref.to_string());
        Ok(())
    }

    async fn refresh_credential(&self, _credential: &Credential) -> Result<RefreshedTokens> {
        *self.refreshes.lock().unwrap() += 1;
        Ok(RefreshedTokens {
            access_token: "refreshed-token".to_string(),
            refresh_token: Some("refreshed-refresh".to_string()),
            expires_at: Some(Utc::now() + Duration::days(60)),
        })
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        credential_sealing_key: Some(TEST_SEALING_KEY.to_string()),
        linkedin_client_id: None,
        linkedin_client_secret: None,
        worker_concurrency: 1,
        queue_max_attempts: 5,
        autopilot_interval_secs: 60,
        momentum_interval_secs: 900,
        requeue_interval_secs: 300,
        momentum_window_hours: 24.0,
        hot_score_threshold: 0.25,
        platform_timeout_secs: 5,
    }
}

/// Deps wired to the given pool and a scripted fake platform registered as
/// the linkedin provider.
pub fn test_deps(pool: PgPool) -> (ServerDeps, Arc<FakePlatform>) {
    let platform = Arc::new(FakePlatform::default());
    let mut registry = PlatformRegistry::new();
    registry.register(PROVIDER_LINKEDIN, platform.clone());

    let deps = ServerDeps::new(
        pool,
        reqwest::Client::new(),
        Arc::new(registry),
        test_config(),
    );
    (deps, platform)
}

pub async fn seed_tenant(pool: &PgPool) -> Result<Tenant> {
    Tenant::create("Test Tenant", false, pool).await
}

pub async fn seed_paused_tenant(pool: &PgPool) -> Result<Tenant> {
    Tenant::create("Paused Tenant", true, pool).await
}

pub async fn seed_credential(tenant_id: Uuid, pool: &PgPool) -> Result<()> {
    PlatformCredential::save(
        tenant_id,
        PROVIDER_LINKEDIN,
        "access-token",
        Some("refresh-token"),
        Some(Utc::now() + Duration::days(30)),
        "urn:li:organization:42",
        TEST_SEALING_KEY,
        pool,
    )
    .await
}

pub async fn seed_expiring_credential(
    tenant_id: Uuid,
    expires_at: DateTime<Utc>,
    pool: &PgPool,
) -> Result<()> {
    PlatformCredential::save(
        tenant_id,
        PROVIDER_LINKEDIN,
        "stale-token",
        Some("refresh-token"),
        Some(expires_at),
        "urn:li:organization:42",
        TEST_SEALING_KEY,
        pool,
    )
    .await
}

pub async fn seed_approved_content(tenant_id: Uuid, pool: &PgPool) -> Result<ContentItem> {
    ContentItem::create(
        tenant_id,
        None,
        "Why momentum matters",
        "A short post about catching topics on the way up.",
        ContentStatus::Approved,
        pool,
    )
    .await
}

pub async fn seed_draft_content(tenant_id: Uuid, pool: &PgPool) -> Result<ContentItem> {
    ContentItem::create(
        tenant_id,
        None,
        "Draft thoughts",
        "Not yet reviewed.",
        ContentStatus::Draft,
        pool,
    )
    .await
}

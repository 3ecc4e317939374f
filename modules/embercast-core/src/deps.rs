use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::platform::PlatformRegistry;

/// Central dependency container passed to all activities and loops.
#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub http_client: reqwest::Client,
    pub platforms: Arc<PlatformRegistry>,
    pub config: AppConfig,
}

impl ServerDeps {
    pub fn new(
        db_pool: PgPool,
        http_client: reqwest::Client,
        platforms: Arc<PlatformRegistry>,
        config: AppConfig,
    ) -> Self {
        Self {
            db_pool,
            http_client,
            platforms,
            config,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db_pool
    }
}

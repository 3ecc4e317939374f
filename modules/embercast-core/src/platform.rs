//! Platform seam. The publish executor and rollback resolver talk to
//! external publishing platforms only through `PlatformClient`; concrete
//! adapters live in `embercast-domains::publishing::adapters`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// How close to expiry a token may get before we refresh it anyway.
const REFRESH_SKEW_SECS: i64 = 60;

/// A tenant's unsealed credential for one provider.
#[derive(Debug, Clone)]
pub struct Credential {
    pub provider: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Posting identity on the platform (e.g. an organization URN).
    pub author_ref: String,
}

impl Credential {
    /// Expired, or expiring within the skew window. Credentials without an
    /// expiry never refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + Duration::seconds(REFRESH_SKEW_SECS),
            None => false,
        }
    }
}

/// Content rendered for submission to a platform.
#[derive(Debug, Clone)]
pub struct RenderedPost {
    pub text: String,
}

/// Outcome of one platform publish call. Transport failures are folded in
/// (`success = false`, `error` set) rather than surfaced as `Err`, so the
/// executor applies a single failure policy to HTTP errors and API
/// rejections alike.
#[derive(Debug, Clone, Default)]
pub struct PlatformResponse {
    pub success: bool,
    pub status: Option<u16>,
    pub body: Option<serde_json::Value>,
    pub error: Option<String>,
    pub post_ref: Option<String>,
    pub post_url: Option<String>,
}

/// Fresh tokens from a provider's refresh flow.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Submit a rendered post as the credential's author identity.
    async fn publish(&self, post: &RenderedPost, credential: &Credential) -> PlatformResponse;

    /// Delete a previously published post by its platform reference.
    async fn delete_post(&self, post_ref: &str, credential: &Credential) -> Result<()>;

    /// Run the provider's refresh flow for an expiring credential.
    async fn refresh_credential(&self, credential: &Credential) -> Result<RefreshedTokens>;
}

/// Provider name → client, built once at startup.
#[derive(Default)]
pub struct PlatformRegistry {
    clients: HashMap<String, Arc<dyn PlatformClient>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn register(&mut self, provider: &str, client: Arc<dyn PlatformClient>) {
        self.clients.insert(provider.to_string(), client);
    }

    pub fn get(&self, provider: &str) -> Option<Arc<dyn PlatformClient>> {
        self.clients.get(provider).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

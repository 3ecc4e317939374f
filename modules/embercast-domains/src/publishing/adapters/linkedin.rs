//! LinkedIn adapter: folds the vendored REST client into the platform seam.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::warn;

use embercast_core::{
    AppConfig, Credential, PlatformClient, PlatformRegistry, PlatformResponse, RefreshedTokens,
    RenderedPost,
};
use linkedin_client::{LinkedInClient, LinkedInError};

pub const PROVIDER_LINKEDIN: &str = "linkedin";

pub struct LinkedInPlatform {
    client: LinkedInClient,
}

impl LinkedInPlatform {
    pub fn new(http: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self {
            client: LinkedInClient::with_http_client(http, client_id, client_secret),
        }
    }
}

#[async_trait]
impl PlatformClient for LinkedInPlatform {
    async fn publish(&self, post: &RenderedPost, credential: &Credential) -> PlatformResponse {
        match self
            .client
            .create_post(&credential.access_token, &credential.author_ref, &post.text)
            .await
        {
            Ok(created) => PlatformResponse {
                success: true,
                status: Some(201),
                post_ref: Some(created.urn),
                post_url: Some(created.url),
                ..Default::default()
            },
            Err(LinkedInError::Api { status, message }) => PlatformResponse {
                success: false,
                status: Some(status),
                body: serde_json::from_str(&message).ok(),
                error: Some(message),
                ..Default::default()
            },
            // Transport and parse failures carry no HTTP status; the
            // executor classifies them as transient.
            Err(e) => PlatformResponse {
                success: false,
                error: Some(e.to_string()),
                ..Default::default()
            },
        }
    }

    async fn delete_post(&self, post_ref: &str, credential: &Credential) -> Result<()> {
        self.client
            .delete_post(&credential.access_token, post_ref)
            .await
            .map_err(Into::into)
    }

    async fn refresh_credential(&self, credential: &Credential) -> Result<RefreshedTokens> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| anyhow!("credential has no refresh token"))?;
        let token = self.client.refresh_access_token(refresh_token).await?;
        Ok(RefreshedTokens {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Some(Utc::now() + Duration::seconds(token.expires_in)),
        })
    }
}

/// Build the provider registry from configuration. Providers without
/// configured app credentials are left out with a warning rather than
/// failing startup.
pub fn build_platform_registry(config: &AppConfig, http: &reqwest::Client) -> PlatformRegistry {
    let mut registry = PlatformRegistry::new();

    match (&config.linkedin_client_id, &config.linkedin_client_secret) {
        (Some(id), Some(secret)) => {
            registry.register(
                PROVIDER_LINKEDIN,
                Arc::new(LinkedInPlatform::new(http.clone(), id.clone(), secret.clone())),
            );
        }
        _ => warn!("LinkedIn app credentials not configured, linkedin publishing disabled"),
    }

    registry
}

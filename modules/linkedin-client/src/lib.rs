pub mod error;
pub mod types;

pub use error::{LinkedInError, Result};
pub use types::{ApiErrorBody, CreatePostRequest, CreatedPost, TokenResponse};

const BASE_URL: &str = "https://api.linkedin.com";
const OAUTH_TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";

/// Versioned-API month LinkedIn pins request/response shapes to.
const API_VERSION: &str = "202506";

pub struct LinkedInClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl LinkedInClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
        }
    }

    /// Build on a shared reqwest client (timeouts configured by the caller).
    pub fn with_http_client(
        client: reqwest::Client,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            client,
            client_id,
            client_secret,
        }
    }

    /// Create a public text post as the given author identity.
    /// Returns the post URN (from the `x-restli-id` header) and a feed URL.
    pub async fn create_post(
        &self,
        access_token: &str,
        author: &str,
        commentary: &str,
    ) -> Result<CreatedPost> {
        let body = CreatePostRequest::public_text(author, commentary);

        let url = format!("{}/rest/posts", BASE_URL);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header("LinkedIn-Version", API_VERSION)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LinkedInError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let urn = resp
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or(LinkedInError::MissingPostId)?;

        let post_url = format!("https://www.linkedin.com/feed/update/{}/", urn);
        tracing::info!(urn = %urn, "LinkedIn post created");

        Ok(CreatedPost { urn, url: post_url })
    }

    /// Delete a post by URN.
    pub async fn delete_post(&self, access_token: &str, post_urn: &str) -> Result<()> {
        // URNs contain colons; the path segment must be percent-encoded.
        let encoded = post_urn.replace(':', "%3A");
        let url = format!("{}/rest/posts/{}", BASE_URL, encoded);

        let resp = self
            .client
            .delete(&url)
            .bearer_auth(access_token)
            .header("LinkedIn-Version", API_VERSION)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LinkedInError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        tracing::info!(urn = %post_urn, "LinkedIn post deleted");
        Ok(())
    }

    /// Exchange a refresh token for a fresh access token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let resp = self.client.post(OAUTH_TOKEN_URL).form(&params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LinkedInError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let token: TokenResponse = resp.json().await?;
        tracing::info!(expires_in = token.expires_in, "LinkedIn access token refreshed");
        Ok(token)
    }
}

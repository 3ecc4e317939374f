use serde::{Deserialize, Serialize};

// --- Posts API types ---

/// Request body for the versioned Posts API (`POST /rest/posts`).
#[derive(Debug, Clone, Serialize)]
pub struct CreatePostRequest {
    /// Posting identity, e.g. `urn:li:organization:123` or `urn:li:person:...`.
    pub author: String,
    pub commentary: String,
    pub visibility: String,
    pub distribution: Distribution,
    #[serde(rename = "lifecycleState")]
    pub lifecycle_state: String,
    #[serde(rename = "isReshareDisabledByAuthor")]
    pub is_reshare_disabled_by_author: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Distribution {
    #[serde(rename = "feedDistribution")]
    pub feed_distribution: String,
    #[serde(rename = "targetEntities")]
    pub target_entities: Vec<serde_json::Value>,
    #[serde(rename = "thirdPartyDistributionChannels")]
    pub third_party_distribution_channels: Vec<serde_json::Value>,
}

impl CreatePostRequest {
    /// A public, main-feed text post in the published lifecycle state.
    pub fn public_text(author: &str, commentary: &str) -> Self {
        Self {
            author: author.to_string(),
            commentary: commentary.to_string(),
            visibility: "PUBLIC".to_string(),
            distribution: Distribution {
                feed_distribution: "MAIN_FEED".to_string(),
                target_entities: Vec::new(),
                third_party_distribution_channels: Vec::new(),
            },
            lifecycle_state: "PUBLISHED".to_string(),
            is_reshare_disabled_by_author: false,
        }
    }
}

/// A successfully created post. The URN comes back in the `x-restli-id`
/// response header, not the body.
#[derive(Debug, Clone)]
pub struct CreatedPost {
    pub urn: String,
    pub url: String,
}

/// Error body LinkedIn returns on 4xx/5xx (shape varies by endpoint).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: Option<String>,
    #[serde(rename = "serviceErrorCode")]
    pub service_error_code: Option<i64>,
    pub code: Option<String>,
}

// --- OAuth types ---

/// Response from the OAuth2 token endpoint (refresh-token grant).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub refresh_token_expires_in: Option<i64>,
}

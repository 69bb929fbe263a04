//! Managed-actor backend: a narrow client for the Apify platform plus the
//! static table of actors this node knows how to drive.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{Capability, JobType};

const BASE_URL: &str = "https://api.apify.com/v2";

pub const REDDIT_SCRAPER: &str = "trudax~reddit-scraper";
pub const TIKTOK_SEARCH_SCRAPER: &str = "epctex~tiktok-search-scraper";
pub const TIKTOK_TRENDING_SCRAPER: &str = "lexis-solutions~tiktok-trending-videos-scraper";
pub const TWITTER_FOLLOWERS: &str = "kaitoeasyapi~premium-x-follower-scraper-following-data";
pub const WEB_SCRAPER: &str = "apify~website-content-crawler";
pub const LINKEDIN_PROFILE_SEARCH: &str = "harvestapi~linkedin-profile-search";

/// One actor this node can drive: which job type it serves and which
/// capabilities it unlocks once the token can reach it.
pub struct ActorConfig {
    pub actor_id: &'static str,
    pub job_type: JobType,
    pub capabilities: &'static [Capability],
}

/// The actor catalog, keyed by capability at detection time.
pub const ACTORS: &[ActorConfig] = &[
    ActorConfig {
        actor_id: REDDIT_SCRAPER,
        job_type: JobType::Reddit,
        capabilities: crate::capabilities::registry::REDDIT_CAPS,
    },
    ActorConfig {
        actor_id: TIKTOK_SEARCH_SCRAPER,
        job_type: JobType::Tiktok,
        capabilities: &[Capability::SearchByQuery],
    },
    ActorConfig {
        actor_id: TIKTOK_TRENDING_SCRAPER,
        job_type: JobType::Tiktok,
        capabilities: &[Capability::SearchByTrending],
    },
    ActorConfig {
        actor_id: TWITTER_FOLLOWERS,
        job_type: JobType::Twitter,
        capabilities: &[Capability::GetFollowers, Capability::GetFollowing],
    },
    ActorConfig {
        actor_id: WEB_SCRAPER,
        job_type: JobType::Web,
        capabilities: crate::capabilities::registry::WEB_CAPS,
    },
    ActorConfig {
        actor_id: LINKEDIN_PROFILE_SEARCH,
        job_type: JobType::Linkedin,
        capabilities: crate::capabilities::registry::LINKEDIN_CAPS,
    },
];

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: UserInfo,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    username: String,
}

/// Narrow client for the Apify actor-execution service.
pub struct ApifyClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl ApifyClient {
    pub fn new(token: impl Into<String>) -> Result<Self, ApifyError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ApifyError::MissingToken);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            token,
            base_url: BASE_URL.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: base_url.into(),
        }
    }

    /// Verify the token authenticates against the platform.
    pub async fn validate_api_key(&self) -> Result<(), ApifyError> {
        let url = format!("{}/users/me?token={}", self.base_url, self.token);
        let response = self.http.get(&url).send().await?;
        match response.status() {
            status if status.is_success() => {
                let user: UserEnvelope = response.json().await?;
                debug!(user = %user.data.username, "apify token validated");
                Ok(())
            }
            StatusCode::UNAUTHORIZED => Err(ApifyError::InvalidToken),
            status => Err(ApifyError::Api(format!("status {status}"))),
        }
    }

    /// Check whether the token can access an actor, without running it.
    pub async fn probe_actor_access(&self, actor_id: &str) -> Result<bool, ApifyError> {
        let url = format!("{}/acts/{}?token={}", self.base_url, actor_id, self.token);
        let response = self.http.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    /// Run an actor synchronously and return its dataset items.
    pub async fn run_actor(
        &self,
        actor_id: &str,
        input: &Value,
        limit: u64,
    ) -> Result<Vec<Value>, ApifyError> {
        let url = format!(
            "{}/acts/{}/run-sync-get-dataset-items?token={}&limit={}",
            self.base_url, actor_id, self.token, limit
        );

        debug!(actor = %actor_id, %limit, "running apify actor");
        let response = self.http.post(&url).json(input).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::TOO_MANY_REQUESTS => Err(ApifyError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApifyError::InvalidToken),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ApifyError::Api(format!(
                    "actor {actor_id} failed with status {status}: {body}"
                )))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApifyError {
    #[error("no Apify API key available")]
    MissingToken,

    #[error("Apify API key rejected")]
    InvalidToken,

    #[error("Apify rate limit exceeded")]
    RateLimited,

    #[error("Apify API error: {0}")]
    Api(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

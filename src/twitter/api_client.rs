use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::twitter::pool::ApiKeyTier;
use crate::twitter::TwitterError;

const BASE_URL: &str = "https://api.x.com/2";

/// Recent-search endpoint, available to every key tier.
pub const TWEETS_RECENT: &str = "tweets/search/recent";
/// Full-archive search, available to elevated keys only.
pub const TWEETS_ALL: &str = "tweets/search/all";

#[derive(Debug, Clone, Deserialize)]
pub struct TweetData {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub lang: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchMeta {
    #[serde(default)]
    pub newest_id: String,
    #[serde(default)]
    pub oldest_id: String,
    #[serde(default)]
    pub result_count: u64,
    #[serde(default)]
    pub next_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<TweetData>,
    #[serde(default)]
    pub meta: SearchMeta,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Narrow client for the X API v2. One instance per API key.
pub struct TwitterApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TwitterApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub(crate) fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Probe the key's privilege tier: a request against the full-archive
    /// endpoint succeeds for elevated keys and is refused for basic ones.
    pub async fn probe_tier(&self) -> Result<ApiKeyTier, TwitterError> {
        let url = format!("{}/{}?query=%22probe%22&max_results=10", self.base_url, TWEETS_ALL);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(ApiKeyTier::Elevated),
            StatusCode::FORBIDDEN => Ok(ApiKeyTier::Basic),
            StatusCode::TOO_MANY_REQUESTS => Err(TwitterError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(TwitterError::Auth("invalid API key".into())),
            status => Err(TwitterError::Api(format!(
                "unexpected status {status} while probing key tier"
            ))),
        }
    }

    /// Run a paged tweet search against the given endpoint (recent or full
    /// archive).
    pub async fn search(
        &self,
        endpoint: &str,
        query: &str,
        max_results: i64,
        next_token: &str,
    ) -> Result<SearchResponse, TwitterError> {
        // The API accepts 10..=100 per page.
        let page_size = max_results.clamp(10, 100);
        let mut url = format!(
            "{}/{}?query={}&max_results={}&tweet.fields=author_id,conversation_id,created_at,lang",
            self.base_url,
            endpoint,
            urlencode(query),
            page_size
        );
        if !next_token.is_empty() {
            url.push_str("&next_token=");
            url.push_str(next_token);
        }

        debug!(%endpoint, %query, "twitter api search");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn tweet_lookup(&self, tweet_id: &str) -> Result<TweetData, TwitterError> {
        let url = format!(
            "{}/tweets/{}?tweet.fields=author_id,conversation_id,created_at,lang",
            self.base_url, tweet_id
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let envelope: DataEnvelope<TweetData> = Self::decode(response).await?;
        Ok(envelope.data)
    }

    pub async fn user_by_id(&self, user_id: &str) -> Result<UserData, TwitterError> {
        let url = format!("{}/users/{}", self.base_url, user_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let envelope: DataEnvelope<UserData> = Self::decode(response).await?;
        Ok(envelope.data)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TwitterError> {
        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(TwitterError::RateLimited),
            status if status.is_success() => Ok(response.json().await?),
            status => {
                let body: ApiErrorBody = response.json().await.unwrap_or(ApiErrorBody {
                    errors: Vec::new(),
                    title: String::new(),
                });
                let detail = body
                    .errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or(body.title);
                match status {
                    StatusCode::UNAUTHORIZED => Err(TwitterError::Auth(detail)),
                    StatusCode::FORBIDDEN => Err(TwitterError::Forbidden(detail)),
                    _ => Err(TwitterError::Api(format!("status {status}: {detail}"))),
                }
            }
        }
    }
}

fn urlencode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::http_server;
    use axum::{routing::get, Json, Router};

    #[tokio::test]
    async fn search_decodes_tweets_and_pagination_token() {
        let base = http_server(Router::new().route(
            "/tweets/search/recent",
            get(|| async {
                Json(serde_json::json!({
                    "data": [{"id": "1", "text": "hello", "author_id": "9"}],
                    "meta": {"result_count": 1, "next_token": "tok-2"}
                }))
            }),
        ))
        .await;

        let client = TwitterApiClient::with_base_url("key", base);
        let page = client.search(TWEETS_RECENT, "hello", 10, "").await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, "1");
        assert_eq!(page.data[0].author_id, "9");
        assert_eq!(page.meta.next_token, "tok-2");
    }

    #[tokio::test]
    async fn backend_statuses_map_to_typed_errors() {
        let base = http_server(
            Router::new()
                .route(
                    "/tweets/search/recent",
                    get(|| async { (StatusCode::TOO_MANY_REQUESTS, "{}") }),
                )
                .route(
                    "/tweets/1",
                    get(|| async { (StatusCode::UNAUTHORIZED, r#"{"title":"Unauthorized"}"#) }),
                )
                .route(
                    "/users/2",
                    get(|| async {
                        (StatusCode::FORBIDDEN, r#"{"errors":[{"message":"no access"}]}"#)
                    }),
                ),
        )
        .await;

        let client = TwitterApiClient::with_base_url("key", base);
        assert!(matches!(
            client.search(TWEETS_RECENT, "q", 10, "").await,
            Err(TwitterError::RateLimited)
        ));
        assert!(matches!(
            client.tweet_lookup("1").await,
            Err(TwitterError::Auth(_))
        ));
        assert!(matches!(
            client.user_by_id("2").await,
            Err(TwitterError::Forbidden(msg)) if msg == "no access"
        ));
    }

    #[tokio::test]
    async fn tier_follows_full_archive_access() {
        let elevated = http_server(Router::new().route(
            "/tweets/search/all",
            get(|| async { Json(serde_json::json!({"meta": {"result_count": 0}})) }),
        ))
        .await;
        let client = TwitterApiClient::with_base_url("key", elevated);
        assert_eq!(client.probe_tier().await.unwrap(), ApiKeyTier::Elevated);

        let basic = http_server(Router::new().route(
            "/tweets/search/all",
            get(|| async { (StatusCode::FORBIDDEN, "{}") }),
        ))
        .await;
        let client = TwitterApiClient::with_base_url("key", basic);
        assert_eq!(client.probe_tier().await.unwrap(), ApiKeyTier::Basic);
    }
}

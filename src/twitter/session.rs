use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::twitter::pool::TwitterAccount;
use crate::twitter::TwitterError;

const BASE_URL: &str = "https://api.x.com/1.1";

/// Narrow credential-backed client over the legacy Twitter endpoints. One
/// instance per checked-out account; responses are passed through as opaque
/// JSON, the node never interprets them beyond pagination cursors.
pub struct SessionClient {
    http: reqwest::Client,
    account: TwitterAccount,
    base_url: String,
}

impl SessionClient {
    pub fn new(account: TwitterAccount) -> Self {
        Self {
            http: reqwest::Client::new(),
            account,
            base_url: BASE_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_base_url(account: TwitterAccount, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            account,
            base_url: base_url.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.account.username
    }

    pub async fn search_tweets(&self, query: &str, count: i64) -> Result<Value, TwitterError> {
        self.get(&format!(
            "search/tweets.json?q={}&count={}&result_type=recent",
            urlencode(query),
            count
        ))
        .await
    }

    pub async fn tweet(&self, tweet_id: &str) -> Result<Value, TwitterError> {
        self.get(&format!("statuses/show.json?id={tweet_id}")).await
    }

    pub async fn profile(&self, username: &str) -> Result<Value, TwitterError> {
        self.get(&format!("users/show.json?screen_name={}", urlencode(username)))
            .await
    }

    pub async fn profile_by_id(&self, user_id: &str) -> Result<Value, TwitterError> {
        self.get(&format!("users/show.json?user_id={user_id}")).await
    }

    /// Returns the page plus the cursor for the next one ("" when exhausted).
    pub async fn user_tweets(
        &self,
        username: &str,
        count: i64,
        cursor: &str,
    ) -> Result<(Value, String), TwitterError> {
        let mut path = format!(
            "statuses/user_timeline.json?screen_name={}&count={}",
            urlencode(username),
            count
        );
        if !cursor.is_empty() {
            path.push_str("&max_id=");
            path.push_str(cursor);
        }
        let page = self.get(&path).await?;
        let next = extract_cursor(&page);
        Ok((page, next))
    }

    pub async fn user_media(
        &self,
        username: &str,
        count: i64,
        cursor: &str,
    ) -> Result<(Value, String), TwitterError> {
        let mut path = format!(
            "statuses/user_timeline.json?screen_name={}&count={}&exclude_replies=true&include_entities=true",
            urlencode(username),
            count
        );
        if !cursor.is_empty() {
            path.push_str("&max_id=");
            path.push_str(cursor);
        }
        let page = self.get(&path).await?;
        let next = extract_cursor(&page);
        Ok((page, next))
    }

    /// The account's own home timeline (followed accounts).
    pub async fn home_tweets(
        &self,
        count: i64,
        cursor: &str,
    ) -> Result<(Value, String), TwitterError> {
        self.timeline("statuses/home_timeline.json", count, cursor)
            .await
    }

    /// The account's recommended ("for you") timeline.
    pub async fn for_you_tweets(
        &self,
        count: i64,
        cursor: &str,
    ) -> Result<(Value, String), TwitterError> {
        self.timeline("statuses/recommended_timeline.json", count, cursor)
            .await
    }

    async fn timeline(
        &self,
        endpoint: &str,
        count: i64,
        cursor: &str,
    ) -> Result<(Value, String), TwitterError> {
        let mut path = format!("{endpoint}?count={count}");
        if !cursor.is_empty() {
            path.push_str("&max_id=");
            path.push_str(cursor);
        }
        let page = self.get(&path).await?;
        let next = extract_cursor(&page);
        Ok((page, next))
    }

    pub async fn replies(&self, tweet_id: &str, cursor: &str) -> Result<Value, TwitterError> {
        let mut path = format!(
            "search/tweets.json?q=to%3A{tweet_id}&count=100&result_type=recent"
        );
        if !cursor.is_empty() {
            path.push_str("&max_id=");
            path.push_str(cursor);
        }
        self.get(&path).await
    }

    pub async fn retweeters(
        &self,
        tweet_id: &str,
        count: i64,
        cursor: &str,
    ) -> Result<Value, TwitterError> {
        let mut path = format!("statuses/retweets/{tweet_id}.json?count={count}");
        if !cursor.is_empty() {
            path.push_str("&cursor=");
            path.push_str(cursor);
        }
        self.get(&path).await
    }

    pub async fn trends(&self) -> Result<Value, TwitterError> {
        // Worldwide trends; WOEID 1.
        self.get("trends/place.json?id=1").await
    }

    pub async fn space(&self, space_id: &str) -> Result<Value, TwitterError> {
        self.get(&format!("spaces/show.json?id={space_id}")).await
    }

    async fn get(&self, path_and_query: &str) -> Result<Value, TwitterError> {
        let url = format!("{}/{}", self.base_url, path_and_query);
        debug!(account = %self.account.username, %url, "credential-backed request");

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.account.username, Some(&self.account.password))
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(TwitterError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TwitterError::Auth(format!(
                "authentication failed for {}",
                self.account.username
            ))),
            status if status.is_success() => Ok(response.json().await?),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(TwitterError::Api(format!("status {status}: {body}")))
            }
        }
    }
}

fn extract_cursor(page: &Value) -> String {
    page.get("next_cursor_str")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn urlencode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::http_server;
    use axum::{routing::get, Json, Router};

    fn account() -> TwitterAccount {
        TwitterAccount {
            username: "user".into(),
            password: "pass".into(),
        }
    }

    #[tokio::test]
    async fn user_timeline_extracts_pagination_cursor() {
        let base = http_server(Router::new().route(
            "/statuses/user_timeline.json",
            get(|| async {
                Json(serde_json::json!({
                    "statuses": [{"id_str": "42"}],
                    "next_cursor_str": "171"
                }))
            }),
        ))
        .await;

        let session = SessionClient::with_base_url(account(), base);
        let (page, next) = session.user_tweets("someone", 20, "").await.unwrap();
        assert_eq!(next, "171");
        assert!(page["statuses"].is_array());
    }

    #[tokio::test]
    async fn page_without_cursor_ends_pagination() {
        let base = http_server(Router::new().route(
            "/statuses/home_timeline.json",
            get(|| async { Json(serde_json::json!({"statuses": []})) }),
        ))
        .await;

        let session = SessionClient::with_base_url(account(), base);
        let (_, next) = session.home_tweets(20, "").await.unwrap();
        assert!(next.is_empty());
    }

    #[tokio::test]
    async fn rate_limit_and_auth_statuses_are_distinguished() {
        let base = http_server(
            Router::new()
                .route(
                    "/search/tweets.json",
                    get(|| async { (StatusCode::TOO_MANY_REQUESTS, "") }),
                )
                .route(
                    "/users/show.json",
                    get(|| async { (StatusCode::UNAUTHORIZED, "") }),
                ),
        )
        .await;

        let session = SessionClient::with_base_url(account(), base);
        assert!(matches!(
            session.search_tweets("q", 10).await,
            Err(TwitterError::RateLimited)
        ));
        assert!(matches!(
            session.profile("someone").await,
            Err(TwitterError::Auth(_))
        ));
    }
}

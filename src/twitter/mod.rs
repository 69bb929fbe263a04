//! Twitter-family job execution: capability routing across three backends
//! (credential pool, API keys, managed actors) with rotation, rate-limit
//! cooldown and API-key tier gating.

pub mod api_client;
pub mod pool;
pub mod session;

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::apify::{self, ApifyClient, ApifyError};
use crate::args::twitter::SearchArguments;
use crate::models::{Capability, Job, JobResult, JobType};
use crate::twitter::api_client::{TwitterApiClient, TWEETS_ALL, TWEETS_RECENT};
use crate::twitter::pool::{AccountPool, ApiKeyTier};
use crate::twitter::session::SessionClient;

/// Which execution path serves a capability. The table is static: capability
/// to backend is never guessed at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Credential,
    ApiKey,
    Actor,
}

fn backend_for(job_type: JobType, capability: Capability) -> Result<Backend, TwitterError> {
    use Capability::*;

    match capability {
        GetFollowers | GetFollowing => Ok(Backend::Actor),
        SearchByFullArchive => Ok(Backend::ApiKey),
        SearchByQuery | GetById | GetProfileById if job_type == JobType::TwitterApi => {
            Ok(Backend::ApiKey)
        }
        SearchByQuery | SearchByProfile | GetById | GetReplies | GetRetweeters | GetTweets
        | GetMedia | GetHomeTweets | GetForYouTweets | GetProfileById | GetTrends | GetSpace
        | GetProfile => Ok(Backend::Credential),
        other => Err(TwitterError::UnsupportedCapability(other)),
    }
}

/// Executes Twitter-family jobs against the best available backend.
pub struct TwitterScraper {
    pool: Arc<AccountPool>,
    apify: Option<Arc<ApifyClient>>,
    api_base: Option<String>,
}

impl TwitterScraper {
    pub fn new(pool: Arc<AccountPool>, apify: Option<Arc<ApifyClient>>) -> Self {
        Self {
            pool,
            apify,
            api_base: None,
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, base_url: impl Into<String>) -> Self {
        self.api_base = Some(base_url.into());
        self
    }

    pub async fn execute(&self, job: &Job, args: &SearchArguments) -> Result<JobResult, TwitterError> {
        let capability = args.capability();
        let mut backend = backend_for(job.job_type, capability)?;

        // The general "twitter" job type uses the best available auth: fall
        // back from the credential pool to API keys when no accounts are
        // configured and the capability is also servable by key.
        if backend == Backend::Credential
            && job.job_type == JobType::Twitter
            && !self.pool.has_accounts()
            && self.pool.has_api_keys()
            && crate::capabilities::registry::TWITTER_API_CAPS.contains(&capability)
        {
            debug!(%capability, "no accounts configured, falling back to API-key backend");
            backend = Backend::ApiKey;
        }

        let (data, next_cursor) = match backend {
            Backend::Credential => self.run_with_credentials(capability, args).await?,
            Backend::ApiKey => self.run_with_api_key(capability, args).await?,
            Backend::Actor => self.run_with_actor(capability, args).await?,
        };

        let bytes = serde_json::to_vec(&data).map_err(|e| TwitterError::Api(e.to_string()))?;
        Ok(JobResult::ok(job.clone(), bytes, next_cursor))
    }

    async fn run_with_credentials(
        &self,
        capability: Capability,
        args: &SearchArguments,
    ) -> Result<(Value, String), TwitterError> {
        let account = self.pool.next_account().ok_or(TwitterError::NoCredentials)?;
        let session = SessionClient::new(account);

        let outcome = self.call_credential_backend(&session, capability, args).await;

        // A rate-limit signal cools this account down; other failures must not
        // poison the pool for the remaining accounts.
        if let Err(TwitterError::RateLimited) = &outcome {
            self.pool.mark_rate_limited(session.username());
        }
        outcome
    }

    async fn call_credential_backend(
        &self,
        session: &SessionClient,
        capability: Capability,
        args: &SearchArguments,
    ) -> Result<(Value, String), TwitterError> {
        use Capability::*;

        match capability {
            SearchByQuery => {
                let page = session.search_tweets(&args.query, args.max_results).await?;
                Ok((page, String::new()))
            }
            SearchByProfile | GetProfile => {
                let profile = session.profile(&args.query).await?;
                Ok((profile, String::new()))
            }
            GetProfileById => {
                let profile = session.profile_by_id(&args.query).await?;
                Ok((profile, String::new()))
            }
            GetById => {
                let tweet = session.tweet(&args.query).await?;
                Ok((tweet, String::new()))
            }
            GetTweets => {
                let (page, next) = session
                    .user_tweets(&args.query, args.max_results, &args.next_cursor)
                    .await?;
                Ok((page, next))
            }
            GetMedia => {
                let (page, next) = session
                    .user_media(&args.query, args.max_results, &args.next_cursor)
                    .await?;
                Ok((page, next))
            }
            GetHomeTweets => {
                let (page, next) = session
                    .home_tweets(args.max_results, &args.next_cursor)
                    .await?;
                Ok((page, next))
            }
            GetForYouTweets => {
                let (page, next) = session
                    .for_you_tweets(args.max_results, &args.next_cursor)
                    .await?;
                Ok((page, next))
            }
            GetReplies => {
                let page = session.replies(&args.query, &args.next_cursor).await?;
                Ok((page, args.next_cursor.clone()))
            }
            GetRetweeters => {
                let page = session
                    .retweeters(&args.query, args.max_results, &args.next_cursor)
                    .await?;
                Ok((page, args.next_cursor.clone()))
            }
            GetTrends => {
                let trends = session.trends().await?;
                Ok((trends, String::new()))
            }
            GetSpace => {
                let space = session.space(&args.query).await?;
                Ok((space, String::new()))
            }
            other => Err(TwitterError::UnsupportedCapability(other)),
        }
    }

    async fn run_with_api_key(
        &self,
        capability: Capability,
        args: &SearchArguments,
    ) -> Result<(Value, String), TwitterError> {
        let key = self.pool.next_api_key().ok_or(TwitterError::NoApiKeys)?;
        let client = match self.api_base.as_deref() {
            Some(base) => TwitterApiClient::with_base_url(key.key.clone(), base),
            None => TwitterApiClient::new(key.key.clone()),
        };

        // Tier-gate full-archive before touching the backend. Untested keys
        // are probed once and the result is remembered on the pool.
        if capability == Capability::SearchByFullArchive {
            let tier = match key.tier {
                ApiKeyTier::Unknown => {
                    let detected = client.probe_tier().await?;
                    self.pool.set_key_tier(&key.key, detected);
                    detected
                }
                known => known,
            };
            if tier != ApiKeyTier::Elevated {
                return Err(TwitterError::ElevatedKeyRequired);
            }
        }

        use Capability::*;
        match capability {
            SearchByQuery | SearchByFullArchive => {
                let endpoint = if capability == SearchByFullArchive {
                    TWEETS_ALL
                } else {
                    TWEETS_RECENT
                };
                let page = match client
                    .search(endpoint, &args.query, args.max_results, &args.next_cursor)
                    .await
                {
                    // The backend refusing a full-archive call means the key's
                    // remembered tier is stale: demote it so the gate catches
                    // it on the next rotation.
                    Err(TwitterError::Forbidden(_)) if capability == SearchByFullArchive => {
                        self.pool.set_key_tier(&key.key, ApiKeyTier::Basic);
                        return Err(TwitterError::ElevatedKeyRequired);
                    }
                    other => other?,
                };
                let next = page.meta.next_token.clone();
                let value = json!({
                    "tweets": page.data.iter().map(|t| json!({
                        "id": t.id,
                        "text": t.text,
                        "author_id": t.author_id,
                        "conversation_id": t.conversation_id,
                        "created_at": t.created_at,
                        "lang": t.lang,
                    })).collect::<Vec<_>>(),
                    "newest_id": page.meta.newest_id,
                    "oldest_id": page.meta.oldest_id,
                    "result_count": page.meta.result_count,
                });
                Ok((value, next))
            }
            GetById => {
                let tweet = client.tweet_lookup(&args.query).await?;
                Ok((
                    json!({"id": tweet.id, "text": tweet.text, "author_id": tweet.author_id}),
                    String::new(),
                ))
            }
            GetProfileById => {
                let user = client.user_by_id(&args.query).await?;
                Ok((
                    json!({"id": user.id, "name": user.name, "username": user.username}),
                    String::new(),
                ))
            }
            other => Err(TwitterError::UnsupportedCapability(other)),
        }
    }

    async fn run_with_actor(
        &self,
        capability: Capability,
        args: &SearchArguments,
    ) -> Result<(Value, String), TwitterError> {
        let apify = self.apify.as_ref().ok_or(TwitterError::NoActorBackend)?;

        let input = match capability {
            Capability::GetFollowers => json!({
                "userNames": [args.query],
                "maxFollowers": args.max_results,
                "maxFollowings": 0,
            }),
            Capability::GetFollowing => json!({
                "userNames": [args.query],
                "maxFollowers": 0,
                "maxFollowings": args.max_results,
            }),
            other => return Err(TwitterError::UnsupportedCapability(other)),
        };

        let items = apify
            .run_actor(apify::TWITTER_FOLLOWERS, &input, args.max_results as u64)
            .await?;
        if items.is_empty() {
            warn!(%capability, query = %args.query, "actor returned no profiles");
        }
        Ok((Value::Array(items), String::new()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TwitterError {
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("no Twitter credentials available")]
    NoCredentials,

    #[error("no Twitter API keys available")]
    NoApiKeys,

    #[error("no Apify API key available for actor-backed capabilities")]
    NoActorBackend,

    #[error(
        "this API key is a basic key and does not have access to full archive search; an elevated key is required"
    )]
    ElevatedKeyRequired,

    #[error("twitter authentication failed: {0}")]
    Auth(String),

    #[error("twitter API access forbidden: {0}")]
    Forbidden(String),

    #[error("twitter API error: {0}")]
    Api(String),

    #[error("unsupported capability: {0}")]
    UnsupportedCapability(Capability),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Apify(#[from] ApifyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter::pool::{parse_api_keys, TwitterAccount, TwitterApiKey};
    use std::time::Duration;

    fn scraper(accounts: Vec<TwitterAccount>, keys: Vec<TwitterApiKey>) -> TwitterScraper {
        let pool = Arc::new(AccountPool::new(accounts, keys, Duration::from_secs(900)));
        TwitterScraper::new(pool, None)
    }

    fn args_for(capability: Capability, query: &str) -> SearchArguments {
        let mut bag = crate::models::JobArguments::new();
        bag.insert("query".into(), serde_json::json!(query));
        SearchArguments::decode(&bag, capability).unwrap()
    }

    #[test]
    fn static_backend_table() {
        assert_eq!(
            backend_for(JobType::Twitter, Capability::GetFollowers).unwrap(),
            Backend::Actor
        );
        assert_eq!(
            backend_for(JobType::Twitter, Capability::SearchByFullArchive).unwrap(),
            Backend::ApiKey
        );
        assert_eq!(
            backend_for(JobType::Twitter, Capability::SearchByQuery).unwrap(),
            Backend::Credential
        );
        assert_eq!(
            backend_for(JobType::TwitterApi, Capability::SearchByQuery).unwrap(),
            Backend::ApiKey
        );
        assert!(backend_for(JobType::Twitter, Capability::Scraper).is_err());
    }

    #[tokio::test]
    async fn credential_capability_without_accounts_fails_fast() {
        let scraper = scraper(Vec::new(), Vec::new());
        let args = args_for(Capability::GetReplies, "123");
        let err = scraper
            .run_with_credentials(Capability::GetReplies, &args)
            .await
            .unwrap_err();
        assert!(matches!(err, TwitterError::NoCredentials));
    }

    #[tokio::test]
    async fn forbidden_full_archive_demotes_the_key() {
        use axum::{http::StatusCode, routing::get, Router};

        let base = crate::testing::http_server(Router::new().route(
            "/tweets/search/all",
            get(|| async { (StatusCode::FORBIDDEN, "{}") }),
        ))
        .await;

        let mut keys = parse_api_keys(&["stale-elevated".into()]);
        keys[0].tier = ApiKeyTier::Elevated;
        let pool = Arc::new(AccountPool::new(Vec::new(), keys, Duration::from_secs(900)));
        let scraper = TwitterScraper::new(pool.clone(), None).with_api_base(base);

        let args = args_for(Capability::SearchByFullArchive, "rust");
        let err = scraper
            .run_with_api_key(Capability::SearchByFullArchive, &args)
            .await
            .unwrap_err();
        assert!(matches!(err, TwitterError::ElevatedKeyRequired));
        assert_eq!(pool.tier_of("stale-elevated"), ApiKeyTier::Basic);
    }

    #[tokio::test]
    async fn full_archive_rejects_basic_key_before_any_call() {
        let mut keys = parse_api_keys(&["basic-key".into()]);
        keys[0].tier = ApiKeyTier::Basic;
        let scraper = scraper(Vec::new(), keys);

        let args = args_for(Capability::SearchByFullArchive, "rust");
        let err = scraper
            .run_with_api_key(Capability::SearchByFullArchive, &args)
            .await
            .unwrap_err();
        assert!(matches!(err, TwitterError::ElevatedKeyRequired));
    }

    #[tokio::test]
    async fn actor_capability_without_apify_key_fails_fast() {
        let scraper = scraper(Vec::new(), Vec::new());
        let args = args_for(Capability::GetFollowers, "someone");
        let err = scraper
            .run_with_actor(Capability::GetFollowers, &args)
            .await
            .unwrap_err();
        assert!(matches!(err, TwitterError::NoActorBackend));
    }
}

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::error;

use crate::apify::{self, ApifyClient};
use crate::args::{reddit, tiktok, web, TypedArguments};
use crate::capabilities::CapabilitySnapshot;
use crate::models::{Capability, Job, JobResult};
use crate::tiktok::TranscriptionClient;
use crate::twitter::TwitterScraper;

/// Routes a decoded job to the executor for its job type. One instance is
/// shared by every worker in the pool.
pub struct Dispatcher {
    twitter: TwitterScraper,
    apify: Option<Arc<ApifyClient>>,
    transcription: TranscriptionClient,
    capabilities: Arc<CapabilitySnapshot>,
}

impl Dispatcher {
    pub fn new(
        twitter: TwitterScraper,
        apify: Option<Arc<ApifyClient>>,
        capabilities: Arc<CapabilitySnapshot>,
    ) -> Self {
        Self {
            twitter,
            apify,
            transcription: TranscriptionClient::new(),
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &Arc<CapabilitySnapshot> {
        &self.capabilities
    }

    /// Execute one job to completion. Never panics and never returns Err: any
    /// failure is converted into a terminal JobResult carrying the error.
    pub async fn execute(&self, job: &Job) -> JobResult {
        let args = match TypedArguments::decode(job.job_type, &job.arguments) {
            Ok(args) => args,
            Err(e) => {
                error!(job_type = %job.job_type, error = %e, "argument decoding failed");
                return JobResult::err(job.clone(), e.to_string());
            }
        };

        match args {
            TypedArguments::TwitterSearch(args) => match self.twitter.execute(job, &args).await {
                Ok(result) => result,
                Err(e) => JobResult::err(job.clone(), e.to_string()),
            },
            TypedArguments::Web(args) => self.run_web(job, &args).await,
            TypedArguments::TiktokQuery(args) => self.run_tiktok_query(job, &args).await,
            TypedArguments::TiktokTrending(args) => self.run_tiktok_trending(job, &args).await,
            TypedArguments::TiktokTranscription(args) => {
                self.run_transcription(job, &args).await
            }
            TypedArguments::RedditSearch(args) => self.run_reddit(job, &args).await,
            TypedArguments::LinkedinProfile(args) => self.run_linkedin(job, &args).await,
            TypedArguments::Telemetry(_) => self.run_telemetry(job),
        }
    }

    async fn run_web(&self, job: &Job, args: &web::WebArguments) -> JobResult {
        let input = json!({
            "startUrls": [{"url": args.url}],
            "maxCrawlDepth": args.max_depth,
            "maxCrawlPages": args.max_pages,
            "saveMarkdown": true,
        });
        self.run_actor(job, apify::WEB_SCRAPER, input, args.max_pages as u64)
            .await
    }

    async fn run_tiktok_query(&self, job: &Job, args: &tiktok::QueryArguments) -> JobResult {
        let input = json!({
            "search": args.search,
            "startUrls": args.start_urls,
            "maxItems": args.max_items,
            "endPage": args.end_page,
            "proxy": {"useApifyProxy": true},
        });
        self.run_actor(job, apify::TIKTOK_SEARCH_SCRAPER, input, args.max_items)
            .await
    }

    async fn run_tiktok_trending(&self, job: &Job, args: &tiktok::TrendingArguments) -> JobResult {
        let input = json!({
            "countryCode": args.country_code,
            "sortBy": args.sort_by,
            "maxItems": args.max_items,
            "period": args.period,
        });
        self.run_actor(job, apify::TIKTOK_TRENDING_SCRAPER, input, args.max_items)
            .await
    }

    async fn run_transcription(
        &self,
        job: &Job,
        args: &tiktok::TranscriptionArguments,
    ) -> JobResult {
        match self
            .transcription
            .transcribe(&args.video_url, &args.language)
            .await
        {
            Ok(result) => match serde_json::to_vec(&result) {
                Ok(bytes) => JobResult::ok(job.clone(), bytes, String::new()),
                Err(e) => JobResult::err(job.clone(), e.to_string()),
            },
            Err(e) => JobResult::err(job.clone(), e.to_string()),
        }
    }

    async fn run_reddit(&self, job: &Job, args: &reddit::SearchArguments) -> JobResult {
        let input = match args.capability() {
            Capability::ScrapeUrls => json!({
                "startUrls": args.urls.iter().map(|u| json!({"url": u})).collect::<Vec<_>>(),
                "maxItems": args.max_items,
                "maxPostCount": args.max_posts,
                "includeNSFW": args.include_nsfw,
                "sort": args.sort,
            }),
            capability => json!({
                "searches": args.queries,
                "type": reddit_search_kind(capability),
                "maxItems": args.max_items,
                "maxPostCount": args.max_posts,
                "includeNSFW": args.include_nsfw,
                "sort": args.sort,
            }),
        };
        self.run_actor(job, apify::REDDIT_SCRAPER, input, args.max_items)
            .await
    }

    async fn run_linkedin(
        &self,
        job: &Job,
        args: &crate::args::linkedin::ProfileArguments,
    ) -> JobResult {
        let input = match args.capability() {
            Capability::GetProfile => json!({"profileUrls": [args.query]}),
            _ => json!({"searchQueries": [args.query], "maxItems": args.max_items}),
        };
        self.run_actor(job, apify::LINKEDIN_PROFILE_SEARCH, input, args.max_items)
            .await
    }

    fn run_telemetry(&self, job: &Job) -> JobResult {
        let report = json!({
            "capabilities": self.capabilities.get(),
            "version": env!("CARGO_PKG_VERSION"),
        });
        match serde_json::to_vec(&report) {
            Ok(bytes) => JobResult::ok(job.clone(), bytes, String::new()),
            Err(e) => JobResult::err(job.clone(), e.to_string()),
        }
    }

    async fn run_actor(&self, job: &Job, actor_id: &str, input: Value, limit: u64) -> JobResult {
        let Some(apify) = self.apify.as_ref() else {
            return JobResult::err(job.clone(), "no Apify API key available");
        };
        match apify.run_actor(actor_id, &input, limit).await {
            Ok(items) => match serde_json::to_vec(&items) {
                Ok(bytes) => JobResult::ok(job.clone(), bytes, String::new()),
                Err(e) => JobResult::err(job.clone(), e.to_string()),
            },
            Err(e) => {
                error!(actor = %actor_id, error = %e, "actor run failed");
                JobResult::err(job.clone(), e.to_string())
            }
        }
    }
}

fn reddit_search_kind(capability: Capability) -> &'static str {
    match capability {
        Capability::SearchUsers => "users",
        Capability::SearchCommunities => "communities",
        _ => "posts",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobArguments, JobType};
    use crate::twitter::pool::AccountPool;
    use std::time::Duration;

    fn dispatcher() -> Dispatcher {
        let pool = Arc::new(AccountPool::new(
            Vec::new(),
            Vec::new(),
            Duration::from_secs(900),
        ));
        let snapshot = Arc::new(CapabilitySnapshot::default());
        Dispatcher::new(TwitterScraper::new(pool, None), None, snapshot)
    }

    #[tokio::test]
    async fn telemetry_executes_without_network() {
        let dispatcher = dispatcher();
        let job = Job::new(JobType::Telemetry, JobArguments::new());
        let result = dispatcher.execute(&job).await;
        assert!(result.success(), "error: {:?}", result.error);

        let report: serde_json::Value = result.unmarshal().unwrap();
        assert!(report.get("capabilities").is_some());
    }

    #[tokio::test]
    async fn invalid_arguments_become_terminal_error() {
        let dispatcher = dispatcher();
        let job = Job::new(JobType::Web, JobArguments::new()); // url missing
        let result = dispatcher.execute(&job).await;
        assert!(!result.success());
        assert!(result.error.unwrap().contains("url"));
    }

    #[tokio::test]
    async fn actor_jobs_fail_cleanly_without_apify_key() {
        let dispatcher = dispatcher();
        let mut args = JobArguments::new();
        args.insert("urls".into(), json!(["https://www.reddit.com/r/rust"]));
        let job = Job::new(JobType::Reddit, args);
        let result = dispatcher.execute(&job).await;
        assert!(!result.success());
        assert!(result.error.unwrap().contains("Apify"));
    }
}

mod apify;
mod app_state;
mod args;
mod capabilities;
mod config;
mod jobserver;
mod models;
mod routes;
mod services;
mod tiktok;
mod twitter;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use apify::ApifyClient;
use capabilities::{detector, CapabilitySnapshot};
use config::AppConfig;
use jobserver::{Dispatcher, JobServer};
use services::{envelope::JobEnvelope, sealer::Sealer};
use twitter::pool::{self, AccountPool};
use twitter::TwitterScraper;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing harvest-node server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("jobs_submitted_total", "Total jobs accepted into the queue");
    metrics::describe_counter!("jobs_completed_total", "Total jobs finished successfully");
    metrics::describe_counter!("jobs_failed_total", "Total jobs finished with an error");
    metrics::describe_counter!("jobs_timed_out_total", "Total jobs killed by the timeout");
    metrics::describe_counter!("jobs_rejected_total", "Total jobs rejected at submission");
    metrics::describe_gauge!("job_queue_depth", "Current number of queued jobs");

    // Initialize the sealing service
    tracing::info!("Initializing AES-256-GCM sealing");
    let sealer = Sealer::new(&config.sealing_key).expect("Failed to initialize sealing key");
    let envelope = JobEnvelope::new(Arc::new(sealer));

    // Build the Twitter account pool from configured credentials and keys
    let accounts = pool::parse_accounts(&config.twitter_account_pairs());
    let api_keys = pool::parse_api_keys(&config.twitter_api_key_list());
    tracing::info!(
        accounts = accounts.len(),
        api_keys = api_keys.len(),
        "Twitter auth pool configured"
    );
    let account_pool = Arc::new(AccountPool::new(
        accounts,
        api_keys,
        config.rate_limit_cooldown(),
    ));

    // Apify is optional; without a token the managed-actor backend is absent
    let apify = match ApifyClient::new(config.apify_api_key.clone()) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::info!(reason = %e, "managed-actor backend disabled");
            None
        }
    };

    // Probe credentials and actors to determine what this node can serve
    tracing::info!("Detecting worker capabilities");
    let detected = detector::detect_capabilities(&account_pool, apify.as_ref()).await;
    tracing::info!(job_types = detected.len(), "capability detection complete");
    let capabilities = Arc::new(CapabilitySnapshot::new(detected));

    // Assemble the dispatcher and job server
    let dispatcher = Arc::new(Dispatcher::new(
        TwitterScraper::new(Arc::clone(&account_pool), apify.clone()),
        apify,
        capabilities,
    ));
    let jobs = Arc::new(JobServer::new(
        config.workers,
        config.job_timeout(),
        config.whitelist().into_iter().collect(),
        dispatcher,
    ));

    // Run the worker pool until shutdown
    let cancel = CancellationToken::new();
    let server_handle = {
        let jobs = Arc::clone(&jobs);
        let cancel = cancel.clone();
        tokio::spawn(async move { jobs.run(cancel).await })
    };

    let state = AppState::new(envelope, jobs);

    // Build API routes
    let app = Router::new()
        .route("/healthz", get(routes::health::health_check))
        .route("/job/add", post(routes::job::add_job))
        .route("/job/status/{job_id}", get(routes::job::job_status))
        .route("/job/result", post(routes::job::return_result))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1 MB limit

    tracing::info!("Starting harvest-node on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            cancel.cancel();
        })
        .await
        .expect("Server error");

    // Let the worker pool drain before exiting
    let _ = server_handle.await;
}

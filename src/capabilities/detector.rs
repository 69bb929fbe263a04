//! Runtime capability detection: compute what this node can actually serve
//! from its configured credentials, probing remote services so the node never
//! advertises more than it can currently deliver.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::apify::{ApifyClient, ACTORS};
use crate::capabilities::registry::{
    ALWAYS_AVAILABLE_TELEMETRY_CAPS, ALWAYS_AVAILABLE_TIKTOK_CAPS, TWITTER_API_CAPS,
    TWITTER_CREDENTIAL_CAPS, TWITTER_ELEVATED_API_CAPS,
};
use crate::models::{Capability, JobType, WorkerCapabilities};
use crate::twitter::api_client::TwitterApiClient;
use crate::twitter::pool::{AccountPool, ApiKeyTier};

/// Recompute the node's capability set. Called at startup and whenever
/// credentials change; the result replaces the previous snapshot wholesale.
/// Probe failures are logged and the capability omitted, never fatal.
pub async fn detect_capabilities(
    pool: &Arc<AccountPool>,
    apify: Option<&Arc<ApifyClient>>,
) -> WorkerCapabilities {
    let mut capabilities: WorkerCapabilities = WorkerCapabilities::new();

    // Capabilities that need no external credential.
    capabilities.insert(
        JobType::Telemetry,
        ALWAYS_AVAILABLE_TELEMETRY_CAPS.to_vec(),
    );
    capabilities.insert(JobType::Tiktok, ALWAYS_AVAILABLE_TIKTOK_CAPS.to_vec());

    let mut twitter_caps: BTreeSet<Capability> = BTreeSet::new();

    if pool.has_accounts() {
        twitter_caps.extend(TWITTER_CREDENTIAL_CAPS);
    }

    if pool.has_api_keys() {
        detect_api_key_tiers(pool).await;
        twitter_caps.extend(TWITTER_API_CAPS);
        if pool.has_elevated_key() {
            twitter_caps.extend(TWITTER_ELEVATED_API_CAPS);
        }
    }

    if let Some(apify) = apify {
        match apify.validate_api_key().await {
            Ok(()) => probe_actors(apify, &mut capabilities).await,
            Err(e) => warn!(error = %e, "apify key validation failed, skipping actor capabilities"),
        }
    }

    if !twitter_caps.is_empty() {
        let merged = merge(
            capabilities.remove(&JobType::Twitter).unwrap_or_default(),
            twitter_caps,
        );
        capabilities.insert(JobType::Twitter, merged);
    }

    info!(job_types = capabilities.len(), "capability detection complete");
    capabilities
}

/// Probe every untested API key against the backend and remember its tier.
async fn detect_api_key_tiers(pool: &Arc<AccountPool>) {
    for key in pool.untested_keys() {
        let client = TwitterApiClient::new(key.clone());
        match client.probe_tier().await {
            Ok(tier) => {
                info!(tier = ?tier, "twitter API key classified");
                pool.set_key_tier(&key, tier);
            }
            Err(e) => {
                warn!(error = %e, "twitter API key probe failed");
                pool.set_key_tier(&key, ApiKeyTier::Unknown);
            }
        }
    }
}

/// Probe each configured actor for reachability and union the reachable ones'
/// capabilities into the snapshot.
async fn probe_actors(apify: &Arc<ApifyClient>, capabilities: &mut WorkerCapabilities) {
    for actor in ACTORS {
        match apify.probe_actor_access(actor.actor_id).await {
            Ok(true) => {
                let merged = merge(
                    capabilities.remove(&actor.job_type).unwrap_or_default(),
                    actor.capabilities.iter().copied().collect(),
                );
                capabilities.insert(actor.job_type, merged);
            }
            Ok(false) => {
                warn!(actor = %actor.actor_id, "apify token does not have access to actor")
            }
            Err(e) => warn!(actor = %actor.actor_id, error = %e, "actor probe failed"),
        }
    }
}

fn merge(existing: Vec<Capability>, extra: BTreeSet<Capability>) -> Vec<Capability> {
    let mut set: BTreeSet<Capability> = existing.into_iter().collect();
    set.extend(extra);
    set.into_iter().collect()
}

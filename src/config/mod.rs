use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// AES-256-GCM master sealing key (base64-encoded, 32 bytes).
    pub sealing_key: String,

    /// Number of concurrent job workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Default per-job execution timeout in seconds, applied when a job
    /// carries no timeout of its own.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Cooldown applied to a rate-limited account before it re-enters
    /// rotation, in seconds.
    #[serde(default = "default_rate_limit_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,

    /// Comma-separated list of submitter worker IDs allowed to submit jobs.
    /// Empty means any submitter is accepted.
    #[serde(default)]
    pub miners_white_list: String,

    /// Comma-separated Twitter credential pairs, "username:password".
    #[serde(default)]
    pub twitter_accounts: String,

    /// Comma-separated Twitter API bearer keys.
    #[serde(default)]
    pub twitter_api_keys: String,

    /// Apify API token for managed-actor capabilities.
    #[serde(default)]
    pub apify_api_key: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_job_timeout_secs() -> u64 {
    300
}

fn default_rate_limit_cooldown_secs() -> u64 {
    900
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }

    /// Whitelisted submitter IDs; empty when the whitelist is disabled.
    pub fn whitelist(&self) -> Vec<String> {
        split_csv(&self.miners_white_list)
    }

    pub fn twitter_account_pairs(&self) -> Vec<String> {
        split_csv(&self.twitter_accounts)
    }

    pub fn twitter_api_key_list(&self) -> Vec<String> {
        split_csv(&self.twitter_api_keys)
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_splitting_skips_blanks() {
        assert_eq!(split_csv("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_csv("").is_empty());
        assert!(split_csv(" , ").is_empty());
    }
}

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

/// A credential-pool member. Lifecycle: available → rate-limited-until(T) →
/// available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitterAccount {
    pub username: String,
    pub password: String,
}

/// Privilege tier of an API key, detected by probing the backend on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyTier {
    Unknown,
    Basic,
    Elevated,
}

#[derive(Debug, Clone)]
pub struct TwitterApiKey {
    pub key: String,
    pub tier: ApiKeyTier,
}

struct AccountSlot {
    account: TwitterAccount,
    rate_limited_until: Option<Instant>,
}

struct PoolState {
    accounts: Vec<AccountSlot>,
    account_cursor: usize,
    api_keys: Vec<TwitterApiKey>,
    key_cursor: usize,
}

/// Shared pool of Twitter credentials and API keys. Owns its rotation cursors
/// and rate-limit map behind a single lock; constructed once per node and
/// passed by reference to the strategy selector.
pub struct AccountPool {
    state: Mutex<PoolState>,
    cooldown: Duration,
}

impl AccountPool {
    pub fn new(
        accounts: Vec<TwitterAccount>,
        api_keys: Vec<TwitterApiKey>,
        cooldown: Duration,
    ) -> Self {
        Self {
            state: Mutex::new(PoolState {
                accounts: accounts
                    .into_iter()
                    .map(|account| AccountSlot {
                        account,
                        rate_limited_until: None,
                    })
                    .collect(),
                account_cursor: 0,
                api_keys,
                key_cursor: 0,
            }),
            cooldown,
        }
    }

    pub fn has_accounts(&self) -> bool {
        !self.lock().accounts.is_empty()
    }

    pub fn has_api_keys(&self) -> bool {
        !self.lock().api_keys.is_empty()
    }

    /// Round-robin the next account whose cooldown has elapsed, if any.
    pub fn next_account(&self) -> Option<TwitterAccount> {
        let mut state = self.lock();
        let len = state.accounts.len();
        if len == 0 {
            return None;
        }

        let now = Instant::now();
        for offset in 0..len {
            let idx = (state.account_cursor + offset) % len;
            let available = match state.accounts[idx].rate_limited_until {
                Some(until) if until > now => false,
                _ => true,
            };
            if available {
                state.accounts[idx].rate_limited_until = None;
                state.account_cursor = (idx + 1) % len;
                return Some(state.accounts[idx].account.clone());
            }
        }
        None
    }

    /// Put an account on cooldown after a rate-limit signal. Future selections
    /// skip it until the cooldown elapses.
    pub fn mark_rate_limited(&self, username: &str) {
        let until = Instant::now() + self.cooldown;
        let mut state = self.lock();
        if let Some(slot) = state
            .accounts
            .iter_mut()
            .find(|slot| slot.account.username == username)
        {
            slot.rate_limited_until = Some(until);
            warn!(account = %username, cooldown_secs = self.cooldown.as_secs(), "account rate limited");
        }
    }

    /// Round-robin the next API key, if any are configured.
    pub fn next_api_key(&self) -> Option<TwitterApiKey> {
        let mut state = self.lock();
        let len = state.api_keys.len();
        if len == 0 {
            return None;
        }
        let idx = state.key_cursor % len;
        state.key_cursor = (idx + 1) % len;
        Some(state.api_keys[idx].clone())
    }

    /// Keys still awaiting a tier probe.
    pub fn untested_keys(&self) -> Vec<String> {
        self.lock()
            .api_keys
            .iter()
            .filter(|k| k.tier == ApiKeyTier::Unknown)
            .map(|k| k.key.clone())
            .collect()
    }

    pub fn set_key_tier(&self, key: &str, tier: ApiKeyTier) {
        let mut state = self.lock();
        if let Some(entry) = state.api_keys.iter_mut().find(|k| k.key == key) {
            entry.tier = tier;
        }
    }

    pub fn tier_of(&self, key: &str) -> ApiKeyTier {
        self.lock()
            .api_keys
            .iter()
            .find(|k| k.key == key)
            .map(|k| k.tier)
            .unwrap_or(ApiKeyTier::Unknown)
    }

    pub fn has_elevated_key(&self) -> bool {
        self.lock()
            .api_keys
            .iter()
            .any(|k| k.tier == ApiKeyTier::Elevated)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Parse "username:password" pairs, skipping malformed entries with a warning.
pub fn parse_accounts(pairs: &[String]) -> Vec<TwitterAccount> {
    pairs
        .iter()
        .filter_map(|pair| {
            let (username, password) = pair.split_once(':')?;
            let username = username.trim();
            let password = password.trim();
            if username.is_empty() || password.is_empty() {
                warn!(pair = %pair, "invalid account credentials");
                return None;
            }
            Some(TwitterAccount {
                username: username.to_string(),
                password: password.to_string(),
            })
        })
        .collect()
}

pub fn parse_api_keys(keys: &[String]) -> Vec<TwitterApiKey> {
    keys.iter()
        .map(|key| TwitterApiKey {
            key: key.trim().to_string(),
            tier: ApiKeyTier::Unknown,
        })
        .filter(|k| !k.key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with(usernames: &[&str], cooldown: Duration) -> AccountPool {
        let accounts = usernames
            .iter()
            .map(|u| TwitterAccount {
                username: u.to_string(),
                password: "pw".to_string(),
            })
            .collect();
        AccountPool::new(accounts, Vec::new(), cooldown)
    }

    #[test]
    fn rotates_accounts_in_order() {
        let pool = pool_with(&["a", "b", "c"], Duration::from_secs(900));
        let picked: Vec<_> = (0..4)
            .map(|_| pool.next_account().unwrap().username)
            .collect();
        assert_eq!(picked, ["a", "b", "c", "a"]);
    }

    #[test]
    fn skips_rate_limited_accounts() {
        let pool = pool_with(&["a", "b", "c"], Duration::from_secs(900));
        pool.mark_rate_limited("a");

        for _ in 0..6 {
            let username = pool.next_account().unwrap().username;
            assert_ne!(username, "a");
        }
    }

    #[test]
    fn rate_limited_account_returns_after_cooldown() {
        let pool = pool_with(&["a"], Duration::from_millis(20));
        pool.mark_rate_limited("a");
        assert!(pool.next_account().is_none());

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(pool.next_account().unwrap().username, "a");
    }

    #[test]
    fn exhausted_pool_yields_none() {
        let pool = pool_with(&[], Duration::from_secs(900));
        assert!(pool.next_account().is_none());
        assert!(pool.next_api_key().is_none());
    }

    #[test]
    fn api_key_rotation_and_tiers() {
        let keys = parse_api_keys(&["k1".into(), " k2 ".into(), "".into()]);
        let pool = AccountPool::new(Vec::new(), keys, Duration::from_secs(900));

        assert_eq!(pool.next_api_key().unwrap().key, "k1");
        assert_eq!(pool.next_api_key().unwrap().key, "k2");
        assert_eq!(pool.next_api_key().unwrap().key, "k1");

        assert_eq!(pool.untested_keys().len(), 2);
        pool.set_key_tier("k2", ApiKeyTier::Elevated);
        assert!(pool.has_elevated_key());
        assert_eq!(pool.untested_keys(), vec!["k1".to_string()]);
        assert_eq!(pool.tier_of("k2"), ApiKeyTier::Elevated);
    }

    #[test]
    fn parses_account_pairs() {
        let parsed = parse_accounts(&[
            "user1:pass1".into(),
            "broken".into(),
            " user2 : pass2 ".into(),
        ]);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].username, "user1");
        assert_eq!(parsed[1].username, "user2");
        assert_eq!(parsed[1].password, "pass2");
    }
}

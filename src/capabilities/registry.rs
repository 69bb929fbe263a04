//! Static job-type/capability tables and capability resolution.
//!
//! Which capabilities are *legal* for a job type is fixed at compile time;
//! which ones a node actually advertises is recomputed at runtime by the
//! detector.

use crate::models::{Capability, JobType};

use Capability::*;

/// Capabilities served without any external credential.
pub const ALWAYS_AVAILABLE_TELEMETRY_CAPS: &[Capability] = &[Telemetry];
pub const ALWAYS_AVAILABLE_TIKTOK_CAPS: &[Capability] = &[Transcription];

/// All Twitter capabilities reachable through the credential-pool backend.
pub const TWITTER_CREDENTIAL_CAPS: &[Capability] = &[
    SearchByQuery,
    SearchByProfile,
    GetById,
    GetReplies,
    GetRetweeters,
    GetTweets,
    GetMedia,
    GetHomeTweets,
    GetForYouTweets,
    GetProfileById,
    GetTrends,
    GetSpace,
    GetProfile,
];

/// Twitter capabilities reachable with a basic API key.
pub const TWITTER_API_CAPS: &[Capability] = &[SearchByQuery, GetById, GetProfileById];

/// Twitter capabilities requiring an elevated API key.
pub const TWITTER_ELEVATED_API_CAPS: &[Capability] = &[SearchByFullArchive];

/// Twitter capabilities served by the managed-actor backend.
pub const TWITTER_APIFY_CAPS: &[Capability] = &[GetFollowers, GetFollowing];

pub const TIKTOK_SEARCH_CAPS: &[Capability] = &[SearchByQuery, SearchByTrending];
pub const REDDIT_CAPS: &[Capability] =
    &[ScrapeUrls, SearchPosts, SearchUsers, SearchCommunities];
pub const WEB_CAPS: &[Capability] = &[Scraper];
pub const LINKEDIN_CAPS: &[Capability] = &[SearchByQuery, GetProfile];

// Hand-maintained union of the credential, API, elevated-API and actor sets.
const TWITTER_ALL_CAPS: &[Capability] = &[
    SearchByQuery,
    SearchByProfile,
    SearchByFullArchive,
    GetById,
    GetReplies,
    GetRetweeters,
    GetTweets,
    GetMedia,
    GetHomeTweets,
    GetForYouTweets,
    GetProfileById,
    GetTrends,
    GetSpace,
    GetProfile,
    GetFollowers,
    GetFollowing,
];

const TWITTER_API_ALL_CAPS: &[Capability] =
    &[SearchByQuery, GetById, GetProfileById, SearchByFullArchive];

const TIKTOK_ALL_CAPS: &[Capability] = &[Transcription, SearchByQuery, SearchByTrending];

impl JobType {
    /// The full set of capabilities that is ever legal for this job type.
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            JobType::Twitter => TWITTER_ALL_CAPS,
            JobType::TwitterCredential => TWITTER_CREDENTIAL_CAPS,
            JobType::TwitterApi => TWITTER_API_ALL_CAPS,
            JobType::TwitterApify => TWITTER_APIFY_CAPS,
            JobType::Web => WEB_CAPS,
            JobType::Tiktok => TIKTOK_ALL_CAPS,
            JobType::Reddit => REDDIT_CAPS,
            JobType::Linkedin => LINKEDIN_CAPS,
            JobType::Telemetry => ALWAYS_AVAILABLE_TELEMETRY_CAPS,
        }
    }

    /// The capability substituted when a caller leaves it unspecified.
    pub fn default_capability(self) -> Option<Capability> {
        match self {
            JobType::Twitter | JobType::TwitterCredential | JobType::TwitterApi => {
                Some(SearchByQuery)
            }
            JobType::TwitterApify => Some(GetFollowers),
            JobType::Web => Some(Scraper),
            JobType::Tiktok => Some(Transcription),
            JobType::Reddit => Some(ScrapeUrls),
            JobType::Linkedin => Some(SearchByQuery),
            JobType::Telemetry => Some(Telemetry),
        }
    }
}

/// Resolve a possibly-unspecified capability against a job type: substitute
/// the default when absent, then verify membership in the legal set. The
/// argument is normalized in place so callers always observe the resolved
/// capability afterwards.
pub fn resolve(
    job_type: JobType,
    capability: &mut Option<Capability>,
) -> Result<Capability, RegistryError> {
    let requested = match *capability {
        Some(cap) => cap,
        None => job_type
            .default_capability()
            .ok_or(RegistryError::NoDefault { job_type })?,
    };

    let legal = job_type.capabilities();
    if !legal.contains(&requested) {
        return Err(RegistryError::Unsupported {
            job_type,
            capability: requested,
            legal,
        });
    }

    *capability = Some(requested);
    Ok(requested)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no default capability configured for job type '{job_type}'")]
    NoDefault { job_type: JobType },

    #[error(
        "capability '{capability}' is not valid for job type '{job_type}'. valid capabilities: {legal:?}"
    )]
    Unsupported {
        job_type: JobType,
        capability: Capability,
        legal: &'static [Capability],
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_capability_resolves_to_default() {
        let mut cap = None;
        let resolved = resolve(JobType::Web, &mut cap).unwrap();
        assert_eq!(resolved, Scraper);
        // normalized in place
        assert_eq!(cap, Some(Scraper));
    }

    #[test]
    fn explicit_capability_passes_membership_check() {
        let mut cap = Some(SearchByTrending);
        assert_eq!(resolve(JobType::Tiktok, &mut cap).unwrap(), SearchByTrending);
    }

    #[test]
    fn unsupported_capability_lists_legal_set() {
        let mut cap = Some(GetSpace);
        let err = resolve(JobType::Web, &mut cap).unwrap_err();
        match &err {
            RegistryError::Unsupported { legal, .. } => assert_eq!(*legal, WEB_CAPS),
            other => panic!("unexpected error: {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("getspace"));
        assert!(msg.contains("valid capabilities"));
    }

    #[test]
    fn every_default_is_legal() {
        for job_type in [
            JobType::Twitter,
            JobType::TwitterCredential,
            JobType::TwitterApi,
            JobType::TwitterApify,
            JobType::Web,
            JobType::Tiktok,
            JobType::Reddit,
            JobType::Linkedin,
            JobType::Telemetry,
        ] {
            let default = job_type.default_capability().unwrap();
            assert!(
                job_type.capabilities().contains(&default),
                "{job_type} default {default} not in legal set"
            );
        }
    }

    #[test]
    fn timelines_are_credential_capabilities() {
        for cap in [GetHomeTweets, GetForYouTweets] {
            assert!(TWITTER_CREDENTIAL_CAPS.contains(&cap));
            assert!(JobType::Twitter.capabilities().contains(&cap));
            assert!(!TWITTER_API_ALL_CAPS.contains(&cap));
        }
    }

    #[test]
    fn full_archive_only_on_api_job_types() {
        assert!(TWITTER_API_ALL_CAPS.contains(&SearchByFullArchive));
        assert!(!TWITTER_CREDENTIAL_CAPS.contains(&SearchByFullArchive));
    }
}

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A data-source family served by this node.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum JobType {
    /// General Twitter scraping; uses the best available auth for the capability.
    #[serde(rename = "twitter")]
    #[strum(serialize = "twitter")]
    Twitter,
    /// Twitter scraping restricted to the credential-pool backend.
    #[serde(rename = "twitter-credential")]
    #[strum(serialize = "twitter-credential")]
    TwitterCredential,
    /// Twitter scraping restricted to the API-key backend.
    #[serde(rename = "twitter-api")]
    #[strum(serialize = "twitter-api")]
    TwitterApi,
    /// Twitter scraping restricted to the managed-actor backend.
    #[serde(rename = "twitter-apify")]
    #[strum(serialize = "twitter-apify")]
    TwitterApify,
    #[serde(rename = "web")]
    #[strum(serialize = "web")]
    Web,
    #[serde(rename = "tiktok")]
    #[strum(serialize = "tiktok")]
    Tiktok,
    #[serde(rename = "reddit")]
    #[strum(serialize = "reddit")]
    Reddit,
    #[serde(rename = "linkedin")]
    #[strum(serialize = "linkedin")]
    Linkedin,
    #[serde(rename = "telemetry")]
    #[strum(serialize = "telemetry")]
    Telemetry,
}

/// A named operation within a job type.
///
/// "Unspecified" is always modeled as `Option<Capability>`; the empty-string
/// sentinel of older protocol versions never appears past deserialization.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Capability {
    #[serde(rename = "searchbyquery")]
    #[strum(serialize = "searchbyquery")]
    SearchByQuery,
    #[serde(rename = "searchbyfullarchive")]
    #[strum(serialize = "searchbyfullarchive")]
    SearchByFullArchive,
    #[serde(rename = "searchbyprofile")]
    #[strum(serialize = "searchbyprofile")]
    SearchByProfile,
    #[serde(rename = "searchbytrending")]
    #[strum(serialize = "searchbytrending")]
    SearchByTrending,
    #[serde(rename = "getbyid")]
    #[strum(serialize = "getbyid")]
    GetById,
    #[serde(rename = "getreplies")]
    #[strum(serialize = "getreplies")]
    GetReplies,
    #[serde(rename = "getretweeters")]
    #[strum(serialize = "getretweeters")]
    GetRetweeters,
    #[serde(rename = "gettweets")]
    #[strum(serialize = "gettweets")]
    GetTweets,
    #[serde(rename = "getmedia")]
    #[strum(serialize = "getmedia")]
    GetMedia,
    #[serde(rename = "gethometweets")]
    #[strum(serialize = "gethometweets")]
    GetHomeTweets,
    #[serde(rename = "getforyoutweets")]
    #[strum(serialize = "getforyoutweets")]
    GetForYouTweets,
    #[serde(rename = "getprofilebyid")]
    #[strum(serialize = "getprofilebyid")]
    GetProfileById,
    #[serde(rename = "gettrends")]
    #[strum(serialize = "gettrends")]
    GetTrends,
    #[serde(rename = "getfollowing")]
    #[strum(serialize = "getfollowing")]
    GetFollowing,
    #[serde(rename = "getfollowers")]
    #[strum(serialize = "getfollowers")]
    GetFollowers,
    #[serde(rename = "getspace")]
    #[strum(serialize = "getspace")]
    GetSpace,
    #[serde(rename = "getprofile")]
    #[strum(serialize = "getprofile")]
    GetProfile,
    #[serde(rename = "scraper")]
    #[strum(serialize = "scraper")]
    Scraper,
    #[serde(rename = "transcription")]
    #[strum(serialize = "transcription")]
    Transcription,
    #[serde(rename = "telemetry")]
    #[strum(serialize = "telemetry")]
    Telemetry,
    #[serde(rename = "scrapeurls")]
    #[strum(serialize = "scrapeurls")]
    ScrapeUrls,
    #[serde(rename = "searchposts")]
    #[strum(serialize = "searchposts")]
    SearchPosts,
    #[serde(rename = "searchusers")]
    #[strum(serialize = "searchusers")]
    SearchUsers,
    #[serde(rename = "searchcommunities")]
    #[strum(serialize = "searchcommunities")]
    SearchCommunities,
}

/// Untyped argument bag as received on the wire.
pub type JobArguments = serde_json::Map<String, serde_json::Value>;

/// Mapping from job type to the capabilities this node currently serves.
/// Always replaced wholesale, never edited in place.
pub type WorkerCapabilities = BTreeMap<JobType, Vec<Capability>>;

/// One unit of requested work.
///
/// The UUID is assigned by the server at submission and never serialized to
/// the wire; the nonce is attached exactly once when the envelope is signed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default)]
    pub arguments: JobArguments,
    #[serde(skip)]
    pub uuid: Option<Uuid>,
    // Wire name predates the field's meaning; kept for envelope compatibility.
    #[serde(rename = "quote", default)]
    pub nonce: String,
    #[serde(default)]
    pub worker_id: String,
    #[serde(default)]
    pub target_worker: String,
    /// Per-job execution timeout in seconds; 0 means use the server default.
    #[serde(default)]
    pub timeout: u64,
}

impl Job {
    pub fn new(job_type: JobType, arguments: JobArguments) -> Self {
        Self {
            job_type,
            arguments,
            uuid: None,
            nonce: String::new(),
            worker_id: String::new(),
            target_worker: String::new(),
            timeout: 0,
        }
    }
}

/// The terminal outcome of a job. At most one is ever produced per nonce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    /// Empty/None means success.
    #[serde(default)]
    pub error: Option<String>,
    /// Opaque result bytes (JSON produced by the executing backend).
    #[serde(default)]
    pub data: Vec<u8>,
    /// The originating job.
    pub job: Job,
    /// Pagination token for capabilities that page.
    #[serde(default)]
    pub next_cursor: String,
}

impl JobResult {
    pub fn ok(job: Job, data: Vec<u8>, next_cursor: String) -> Self {
        Self {
            error: None,
            data,
            job,
            next_cursor,
        }
    }

    pub fn err(job: Job, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            data: Vec::new(),
            job,
            next_cursor: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.error.as_deref().map_or(true, str::is_empty)
    }

    /// Deserialize the result data into a typed value.
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&JobType::TwitterCredential).unwrap(),
            "\"twitter-credential\""
        );
        assert_eq!(JobType::Web.to_string(), "web");
        assert_eq!(
            "twitter-apify".parse::<JobType>().unwrap(),
            JobType::TwitterApify
        );
    }

    #[test]
    fn capability_wire_names() {
        assert_eq!(Capability::SearchByQuery.to_string(), "searchbyquery");
        assert_eq!(
            "searchbyfullarchive".parse::<Capability>().unwrap(),
            Capability::SearchByFullArchive
        );
        assert!("bogus".parse::<Capability>().is_err());
    }

    #[test]
    fn job_uuid_not_serialized() {
        let mut job = Job::new(JobType::Web, JobArguments::new());
        job.uuid = Some(Uuid::new_v4());
        let wire = serde_json::to_value(&job).unwrap();
        assert!(wire.get("uuid").is_none());
        assert_eq!(wire["type"], "web");
    }

    #[test]
    fn nonce_travels_under_its_legacy_wire_name() {
        let mut job = Job::new(JobType::Web, JobArguments::new());
        job.nonce = "abc-42".into();
        let wire = serde_json::to_value(&job).unwrap();
        assert_eq!(wire["quote"], "abc-42");
        assert!(wire.get("nonce").is_none());

        let back: Job = serde_json::from_value(wire).unwrap();
        assert_eq!(back.nonce, "abc-42");
    }

    #[test]
    fn result_success() {
        let job = Job::new(JobType::Telemetry, JobArguments::new());
        assert!(JobResult::ok(job.clone(), vec![], String::new()).success());
        assert!(!JobResult::err(job, "boom").success());
    }
}

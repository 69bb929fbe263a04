use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::args::{from_map, ArgsError};
use crate::models::{Capability, JobArguments, ValidationErrors, ViolationKind};

pub const TWITTER_MAX_RESULTS: i64 = 1000;
const DEFAULT_MAX_RESULTS: i64 = 10;

/// Arguments shared by every Twitter capability. `query` carries the search
/// string, username, tweet ID or space ID depending on the capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchArguments {
    #[serde(rename = "type", default)]
    capability: Option<Capability>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub max_results: i64,
    /// Optional ISO-8601 timestamp bounding full-archive searches.
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub next_cursor: String,
}

impl SearchArguments {
    pub(crate) fn decode(args: &JobArguments, capability: Capability) -> Result<Self, ArgsError> {
        let mut decoded: Self = from_map(args)?;
        decoded.capability = Some(capability);
        decoded.set_defaults();
        decoded.validate()?;
        Ok(decoded)
    }

    pub fn capability(&self) -> Capability {
        self.capability.unwrap_or(Capability::SearchByQuery)
    }

    fn set_defaults(&mut self) {
        if self.max_results == 0 {
            self.max_results = DEFAULT_MAX_RESULTS;
        }
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();

        // Trends and the signed-in-account timelines take no query.
        let query_free = matches!(
            self.capability(),
            Capability::GetTrends | Capability::GetHomeTweets | Capability::GetForYouTweets
        );
        if self.query.is_empty() && !query_free {
            errs.push(
                "query",
                ViolationKind::Required,
                format!("query is required for capability '{}'", self.capability()),
            );
        }

        if !(0..=TWITTER_MAX_RESULTS).contains(&self.count) {
            errs.push(
                "count",
                ViolationKind::OutOfRange,
                format!(
                    "must be between 0 and {TWITTER_MAX_RESULTS}, got {}",
                    self.count
                ),
            );
        }

        if !(1..=TWITTER_MAX_RESULTS).contains(&self.max_results) {
            errs.push(
                "max_results",
                ViolationKind::OutOfRange,
                format!(
                    "must be between 1 and {TWITTER_MAX_RESULTS}, got {}",
                    self.max_results
                ),
            );
        }

        for (field, value) in [("start_time", &self.start_time), ("end_time", &self.end_time)] {
            if !value.is_empty() && DateTime::parse_from_rfc3339(value).is_err() {
                errs.push(
                    field,
                    ViolationKind::Malformed,
                    format!("'{value}' is not an RFC 3339 timestamp"),
                );
            }
        }

        errs.into_result()
    }
}

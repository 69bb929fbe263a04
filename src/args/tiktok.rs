use serde::{Deserialize, Serialize};
use url::Url;

use crate::args::{from_map, ArgsError};
use crate::models::{Capability, JobArguments, ValidationErrors, ViolationKind};

const DEFAULT_MAX_ITEMS: u64 = 10;
const DEFAULT_COUNTRY_CODE: &str = "US";
const DEFAULT_PERIOD: &str = "7";
const DEFAULT_SORT_BY: &str = "vv";

/// Arguments for TikTok search by query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryArguments {
    #[serde(rename = "type", default)]
    capability: Option<Capability>,
    #[serde(default)]
    pub search: Vec<String>,
    #[serde(default)]
    pub start_urls: Vec<String>,
    #[serde(default)]
    pub max_items: u64,
    #[serde(default)]
    pub end_page: u64,
}

impl QueryArguments {
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
        if self.max_items == 0 {
            self.max_items = DEFAULT_MAX_ITEMS;
        }
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if self.search.is_empty() && self.start_urls.is_empty() {
            errs.push(
                "search",
                ViolationKind::Required,
                "either 'search' or 'start_urls' is required",
            );
        }
        errs.into_result()
    }
}

/// Arguments for the TikTok trending-videos search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingArguments {
    #[serde(rename = "type", default)]
    capability: Option<Capability>,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub sort_by: String,
    #[serde(default)]
    pub max_items: u64,
    /// Trending window in days; the upstream actor accepts "1", "7" or "30".
    #[serde(default)]
    pub period: String,
}

impl TrendingArguments {
    pub(crate) fn decode(args: &JobArguments, capability: Capability) -> Result<Self, ArgsError> {
        let mut decoded: Self = from_map(args)?;
        decoded.capability = Some(capability);
        decoded.set_defaults();
        decoded.validate()?;
        Ok(decoded)
    }

    pub fn capability(&self) -> Capability {
        self.capability.unwrap_or(Capability::SearchByTrending)
    }

    fn set_defaults(&mut self) {
        if self.country_code.is_empty() {
            self.country_code = DEFAULT_COUNTRY_CODE.to_string();
        }
        if self.sort_by.is_empty() {
            self.sort_by = DEFAULT_SORT_BY.to_string();
        }
        if self.period.is_empty() {
            self.period = DEFAULT_PERIOD.to_string();
        }
        if self.max_items == 0 {
            self.max_items = DEFAULT_MAX_ITEMS;
        }
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if !matches!(self.period.as_str(), "1" | "7" | "30") {
            errs.push(
                "period",
                ViolationKind::OutOfRange,
                format!("must be one of 1, 7 or 30, got '{}'", self.period),
            );
        }
        errs.into_result()
    }
}

/// Arguments for TikTok video transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionArguments {
    #[serde(rename = "type", default)]
    capability: Option<Capability>,
    #[serde(default)]
    pub video_url: String,
    /// Preferred transcript language code, e.g. "eng-US". Empty picks the
    /// first language the video offers.
    #[serde(default)]
    pub language: String,
}

impl TranscriptionArguments {
    pub(crate) fn decode(args: &JobArguments, capability: Capability) -> Result<Self, ArgsError> {
        let mut decoded: Self = from_map(args)?;
        decoded.capability = Some(capability);
        decoded.validate()?;
        Ok(decoded)
    }

    pub fn capability(&self) -> Capability {
        self.capability.unwrap_or(Capability::Transcription)
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();
        if self.video_url.is_empty() {
            errs.push("video_url", ViolationKind::Required, "video_url is required");
        } else if Url::parse(&self.video_url).is_err() {
            errs.push(
                "video_url",
                ViolationKind::Malformed,
                format!("'{}' is not a valid URL", self.video_url),
            );
        }
        errs.into_result()
    }
}

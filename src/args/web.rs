use serde::{Deserialize, Serialize};
use url::Url;

use crate::args::{from_map, ArgsError};
use crate::models::{Capability, JobArguments, ValidationErrors, ViolationKind};

const DEFAULT_MAX_PAGES: i64 = 1;
const MAX_PAGES_LIMIT: i64 = 1000;
const MAX_DEPTH_LIMIT: i64 = 50;

/// Arguments for the web content-crawler capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebArguments {
    #[serde(rename = "type", default)]
    capability: Option<Capability>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub max_depth: i64,
    #[serde(default)]
    pub max_pages: i64,
}

impl WebArguments {
    pub(crate) fn decode(args: &JobArguments, capability: Capability) -> Result<Self, ArgsError> {
        let mut decoded: Self = from_map(args)?;
        decoded.capability = Some(capability);
        decoded.set_defaults();
        decoded.validate()?;
        Ok(decoded)
    }

    pub fn capability(&self) -> Capability {
        self.capability.unwrap_or(Capability::Scraper)
    }

    fn set_defaults(&mut self) {
        if self.max_pages == 0 {
            self.max_pages = DEFAULT_MAX_PAGES;
        }
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();

        if self.url.is_empty() {
            errs.push("url", ViolationKind::Required, "url is required");
        } else {
            match Url::parse(&self.url) {
                Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
                Ok(parsed) => errs.push(
                    "url",
                    ViolationKind::Malformed,
                    format!("unsupported scheme '{}'", parsed.scheme()),
                ),
                Err(e) => errs.push("url", ViolationKind::Malformed, format!("invalid URL: {e}")),
            }
        }

        if !(0..=MAX_DEPTH_LIMIT).contains(&self.max_depth) {
            errs.push(
                "max_depth",
                ViolationKind::OutOfRange,
                format!("must be between 0 and {MAX_DEPTH_LIMIT}, got {}", self.max_depth),
            );
        }

        if !(1..=MAX_PAGES_LIMIT).contains(&self.max_pages) {
            errs.push(
                "max_pages",
                ViolationKind::OutOfRange,
                format!("must be between 1 and {MAX_PAGES_LIMIT}, got {}", self.max_pages),
            );
        }

        errs.into_result()
    }
}

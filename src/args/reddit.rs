use serde::{Deserialize, Serialize};
use url::Url;

use crate::args::{from_map, ArgsError};
use crate::models::{Capability, JobArguments, ValidationErrors, ViolationKind};

const DEFAULT_MAX_ITEMS: u64 = 10;
const DEFAULT_SORT: &str = "new";

/// Arguments for the Reddit scraper actor. `scrapeurls` consumes `urls`;
/// the search capabilities consume `queries`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchArguments {
    #[serde(rename = "type", default)]
    capability: Option<Capability>,
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub sort: String,
    #[serde(default)]
    pub include_nsfw: bool,
    #[serde(default)]
    pub max_items: u64,
    #[serde(default)]
    pub max_posts: u64,
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
        self.capability.unwrap_or(Capability::ScrapeUrls)
    }

    fn set_defaults(&mut self) {
        if self.sort.is_empty() {
            self.sort = DEFAULT_SORT.to_string();
        }
        if self.max_items == 0 {
            self.max_items = DEFAULT_MAX_ITEMS;
        }
        if self.max_posts == 0 {
            self.max_posts = DEFAULT_MAX_ITEMS;
        }
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::new();

        if self.capability() == Capability::ScrapeUrls {
            if self.urls.is_empty() {
                errs.push("urls", ViolationKind::Required, "urls are required");
            }
            for url in &self.urls {
                if Url::parse(url).is_err() {
                    errs.push(
                        "urls",
                        ViolationKind::Malformed,
                        format!("'{url}' is not a valid URL"),
                    );
                }
            }
        } else if self.queries.is_empty() {
            errs.push(
                "queries",
                ViolationKind::Required,
                format!("queries are required for capability '{}'", self.capability()),
            );
        }

        errs.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(json: serde_json::Value) -> JobArguments {
        match json {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn scrapeurls_requires_urls() {
        let err =
            SearchArguments::decode(&bag(serde_json::json!({})), Capability::ScrapeUrls)
                .unwrap_err();
        match err {
            ArgsError::Invalid(errs) => assert!(errs.matches("urls", ViolationKind::Required)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn search_requires_queries() {
        let err =
            SearchArguments::decode(&bag(serde_json::json!({})), Capability::SearchPosts)
                .unwrap_err();
        match err {
            ArgsError::Invalid(errs) => assert!(errs.matches("queries", ViolationKind::Required)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn valid_scrapeurls_with_defaults() {
        let decoded = SearchArguments::decode(
            &bag(serde_json::json!({"urls": ["https://www.reddit.com/r/rust"]})),
            Capability::ScrapeUrls,
        )
        .unwrap();
        assert_eq!(decoded.sort, "new");
        assert_eq!(decoded.max_items, DEFAULT_MAX_ITEMS);
    }

    #[test]
    fn reports_every_bad_url() {
        let err = SearchArguments::decode(
            &bag(serde_json::json!({"urls": ["nope", "also nope"]})),
            Capability::ScrapeUrls,
        )
        .unwrap_err();
        match err {
            ArgsError::Invalid(errs) => assert_eq!(errs.violations().len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

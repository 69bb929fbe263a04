//! Typed decoding of untyped job argument bags.
//!
//! The concrete argument shape is selected by job type and, for job types
//! hosting several capabilities with different shapes, by the `type`
//! discriminator field. Decoding probes the discriminator first, resolves it
//! against the capability registry (substituting the job type's default), and
//! only then decodes the full shape. Field validation never short-circuits:
//! every violation is collected into one [`ValidationErrors`] value.

pub mod linkedin;
pub mod reddit;
pub mod telemetry;
pub mod tiktok;
pub mod twitter;
pub mod web;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::capabilities::registry::{self, RegistryError};
use crate::models::{Capability, JobArguments, JobType, ValidationErrors};

/// Strongly-typed, validated job arguments, one variant per argument shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArguments {
    Web(web::WebArguments),
    TwitterSearch(twitter::SearchArguments),
    TiktokQuery(tiktok::QueryArguments),
    TiktokTrending(tiktok::TrendingArguments),
    TiktokTranscription(tiktok::TranscriptionArguments),
    RedditSearch(reddit::SearchArguments),
    LinkedinProfile(linkedin::ProfileArguments),
    Telemetry(telemetry::TelemetryArguments),
}

impl TypedArguments {
    /// Decode and validate an argument bag for the given job type.
    pub fn decode(job_type: JobType, args: &JobArguments) -> Result<Self, ArgsError> {
        let mut capability = probe_capability(job_type, args)?;
        let resolved = registry::resolve(job_type, &mut capability)?;

        match job_type {
            JobType::Web => Ok(Self::Web(web::WebArguments::decode(args, resolved)?)),

            JobType::Twitter
            | JobType::TwitterCredential
            | JobType::TwitterApi
            | JobType::TwitterApify => Ok(Self::TwitterSearch(
                twitter::SearchArguments::decode(args, resolved)?,
            )),

            JobType::Tiktok => match resolved {
                Capability::SearchByQuery => Ok(Self::TiktokQuery(
                    tiktok::QueryArguments::decode(args, resolved)?,
                )),
                Capability::SearchByTrending => Ok(Self::TiktokTrending(
                    tiktok::TrendingArguments::decode(args, resolved)?,
                )),
                // Transcription is the only other member of the legal set.
                _ => Ok(Self::TiktokTranscription(
                    tiktok::TranscriptionArguments::decode(args, resolved)?,
                )),
            },

            JobType::Reddit => Ok(Self::RedditSearch(reddit::SearchArguments::decode(
                args, resolved,
            )?)),

            JobType::Linkedin => Ok(Self::LinkedinProfile(
                linkedin::ProfileArguments::decode(args, resolved)?,
            )),

            JobType::Telemetry => Ok(Self::Telemetry(telemetry::TelemetryArguments::decode(
                args, resolved,
            )?)),
        }
    }

    /// The resolved capability this argument value targets.
    pub fn capability(&self) -> Capability {
        match self {
            Self::Web(a) => a.capability(),
            Self::TwitterSearch(a) => a.capability(),
            Self::TiktokQuery(a) => a.capability(),
            Self::TiktokTrending(a) => a.capability(),
            Self::TiktokTranscription(a) => a.capability(),
            Self::RedditSearch(a) => a.capability(),
            Self::LinkedinProfile(a) => a.capability(),
            Self::Telemetry(a) => a.capability(),
        }
    }
}

/// Minimal probe decode of the `type` discriminator. The legacy empty string
/// is accepted as "unspecified" so old callers keep working, but it never
/// survives resolution.
fn probe_capability(
    job_type: JobType,
    args: &JobArguments,
) -> Result<Option<Capability>, ArgsError> {
    match args.get("type") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => {
            s.parse::<Capability>()
                .map(Some)
                .map_err(|_| ArgsError::UnknownCapability {
                    capability: s.clone(),
                    job_type,
                })
        }
        Some(other) => Err(ArgsError::BadDiscriminator {
            found: other.clone(),
        }),
    }
}

/// Decode an argument bag into a concrete shape via serde. The `type`
/// discriminator has already been resolved by [`probe_capability`] and is
/// injected by the caller afterwards, so it is dropped here; this also keeps
/// the legacy empty-string sentinel from tripping the enum decode.
pub(crate) fn from_map<T: DeserializeOwned>(args: &JobArguments) -> Result<T, ArgsError> {
    let mut args = args.clone();
    args.remove("type");
    serde_json::from_value(Value::Object(args)).map_err(ArgsError::Malformed)
}

#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    #[error("unknown capability '{capability}' for job type '{job_type}'")]
    UnknownCapability {
        capability: String,
        job_type: JobType,
    },

    #[error("the 'type' field must be a string, got: {found}")]
    BadDiscriminator { found: Value },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to decode job arguments: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("invalid job arguments: {0}")]
    Invalid(#[from] ValidationErrors),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(json: serde_json::Value) -> JobArguments {
        match json {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn web_arguments_decode_with_default_capability() {
        let args = bag(serde_json::json!({"url": "https://example.com"}));
        let decoded = TypedArguments::decode(JobType::Web, &args).unwrap();
        assert_eq!(decoded.capability(), Capability::Scraper);
        match decoded {
            TypedArguments::Web(web) => {
                assert_eq!(web.url, "https://example.com");
                assert_eq!(web.max_pages, 1); // defaulted
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn tiktok_discriminator_selects_shape() {
        let query = bag(serde_json::json!({"type": "searchbyquery", "search": ["cats"]}));
        assert!(matches!(
            TypedArguments::decode(JobType::Tiktok, &query).unwrap(),
            TypedArguments::TiktokQuery(_)
        ));

        let trending = bag(serde_json::json!({"type": "searchbytrending"}));
        assert!(matches!(
            TypedArguments::decode(JobType::Tiktok, &trending).unwrap(),
            TypedArguments::TiktokTrending(_)
        ));

        let transcription =
            bag(serde_json::json!({"video_url": "https://www.tiktok.com/@x/video/1"}));
        assert!(matches!(
            TypedArguments::decode(JobType::Tiktok, &transcription).unwrap(),
            TypedArguments::TiktokTranscription(_)
        ));
    }

    #[test]
    fn unknown_discriminator_is_a_typed_error() {
        let args = bag(serde_json::json!({"type": "frobnicate"}));
        let err = TypedArguments::decode(JobType::Tiktok, &args).unwrap_err();
        assert!(matches!(err, ArgsError::UnknownCapability { .. }));
        assert!(err.to_string().contains("frobnicate"));
    }

    #[test]
    fn capability_outside_legal_set_is_rejected() {
        let args = bag(serde_json::json!({"type": "gettrends", "url": "https://x.com"}));
        let err = TypedArguments::decode(JobType::Web, &args).unwrap_err();
        assert!(matches!(err, ArgsError::Registry(_)));
    }

    #[test]
    fn empty_string_discriminator_means_unspecified() {
        let args = bag(serde_json::json!({"type": "", "url": "https://example.com"}));
        let decoded = TypedArguments::decode(JobType::Web, &args).unwrap();
        assert_eq!(decoded.capability(), Capability::Scraper);

        // The sentinel also selects the default shape for multi-shape types.
        let args = bag(serde_json::json!({
            "type": "",
            "video_url": "https://www.tiktok.com/@x/video/1",
        }));
        let decoded = TypedArguments::decode(JobType::Tiktok, &args).unwrap();
        assert!(matches!(decoded, TypedArguments::TiktokTranscription(_)));
        assert_eq!(decoded.capability(), Capability::Transcription);
    }
}

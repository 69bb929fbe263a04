//! Direct TikTok transcription backend. Unlike search and trending (which go
//! through managed actors) transcription needs no credential, which is why it
//! sits in the always-available capability set.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

const TRANSCRIPTION_URL: &str = "https://submagic-free-tools.fly.dev/api/tiktok-transcription";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    video_title: String,
    /// Language code → subtitle document (WebVTT).
    #[serde(default)]
    subtitles: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionResult {
    pub video_title: String,
    pub language: String,
    pub transcript: String,
}

pub struct TranscriptionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TranscriptionClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: TRANSCRIPTION_URL.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Fetch the transcript of a video, preferring `language` when the video
    /// offers it and falling back to the first available subtitle track.
    pub async fn transcribe(
        &self,
        video_url: &str,
        language: &str,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        debug!(%video_url, "requesting tiktok transcription");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({"url": video_url}))
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(TranscriptionError::RateLimited),
            status if !status.is_success() => {
                return Err(TranscriptionError::Upstream(status.as_u16()))
            }
            _ => {}
        }

        let body: TranscriptionResponse = response.json().await?;

        let (language, transcript) = if !language.is_empty() {
            match body.subtitles.get(language) {
                Some(text) => (language.to_string(), text.clone()),
                None => return Err(TranscriptionError::LanguageUnavailable(language.into())),
            }
        } else {
            body.subtitles
                .into_iter()
                .next()
                .ok_or(TranscriptionError::NoSubtitles)?
        };

        Ok(TranscriptionResult {
            video_title: body.video_title,
            language,
            transcript,
        })
    }
}

impl Default for TranscriptionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("transcription rate limit exceeded")]
    RateLimited,

    #[error("transcription service returned status {0}")]
    Upstream(u16),

    #[error("video has no subtitles for language '{0}'")]
    LanguageUnavailable(String),

    #[error("video has no subtitles")]
    NoSubtitles,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

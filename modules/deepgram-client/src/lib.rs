//! Minimal Deepgram speech-to-text client: posts raw audio bytes to the
//! listen endpoint and extracts the first channel alternative's transcript.

pub mod error;

pub use error::{DeepgramError, Result};

use bytes::Bytes;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.deepgram.com/v1";

/// Options forwarded as query flags on the listen request.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    pub punctuate: bool,
    pub smart_format: bool,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            punctuate: true,
            smart_format: true,
        }
    }
}

pub struct DeepgramClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DeepgramClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Transcribe an audio buffer. Returns the transcript text, or
    /// `NoTranscript` when the response carries none — callers must treat
    /// that as a failure, not as an empty transcription.
    pub async fn transcribe(
        &self,
        audio: Bytes,
        mime_type: &str,
        opts: &TranscribeOptions,
    ) -> Result<String> {
        let endpoint = format!(
            "{}/listen?punctuate={}&smart_format={}",
            self.base_url, opts.punctuate, opts.smart_format
        );

        let resp = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", mime_type)
            .body(audio)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Deepgram API error");
            return Err(DeepgramError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ListenResponse = resp.json().await?;
        let transcript = body
            .results
            .and_then(|r| r.channels.into_iter().next())
            .and_then(|c| c.alternatives.into_iter().next())
            .map(|a| a.transcript)
            .filter(|t| !t.trim().is_empty())
            .ok_or(DeepgramError::NoTranscript)?;

        Ok(transcript)
    }
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    transcript: String,
}

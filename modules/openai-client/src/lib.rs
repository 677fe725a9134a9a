//! Content-evaluation client: asks a chat model for a structured verdict
//! on whether a video transcript satisfies a campaign's guidelines.

pub mod error;

pub use error::{OpenAiError, Result};

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are a content moderator for a creator marketplace. \
Given a campaign brief and a video transcript, decide whether the video satisfies \
the campaign guidelines. Respond with a JSON object: \
{\"approved\": boolean, \"reason\": string, \"confidence\": number between 0 and 1}. \
Confidence reflects how certain you are in the decision.";

/// Campaign context + transcript sent for evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub campaign_title: String,
    pub guidelines: String,
    pub video_outline: String,
    pub transcript: String,
}

/// Structured verdict returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationVerdict {
    pub approved: bool,
    pub reason: String,
    pub confidence: f64,
}

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_MODEL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Evaluate a transcript against a campaign brief. Confidence in the
    /// returned verdict is clamped to [0, 1].
    pub async fn evaluate(&self, req: &EvaluationRequest) -> Result<EvaluationVerdict> {
        let user_prompt = format!(
            "Campaign: {}\n\nGuidelines:\n{}\n\nVideo outline:\n{}\n\nTranscript:\n{}",
            req.campaign_title, req.guidelines, req.video_outline, req.transcript
        );

        let body = serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt },
            ],
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), model = %self.model, "OpenAI API error");
            return Err(OpenAiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletion = resp.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OpenAiError::EmptyCompletion)?;

        parse_verdict(&content)
    }
}

/// Parse the model's JSON verdict, clamping confidence into [0, 1].
fn parse_verdict(content: &str) -> Result<EvaluationVerdict> {
    let mut verdict: EvaluationVerdict = serde_json::from_str(content)
        .map_err(|e| OpenAiError::MalformedVerdict(e.to_string()))?;
    verdict.confidence = verdict.confidence.clamp(0.0, 1.0);
    Ok(verdict)
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_verdict() {
        let verdict =
            parse_verdict(r#"{"approved": true, "reason": "on brief", "confidence": 0.92}"#)
                .unwrap();
        assert!(verdict.approved);
        assert_eq!(verdict.reason, "on brief");
        assert_eq!(verdict.confidence, 0.92);
    }

    #[test]
    fn clamps_out_of_range_confidence() {
        let verdict =
            parse_verdict(r#"{"approved": false, "reason": "off topic", "confidence": 1.4}"#)
                .unwrap();
        assert_eq!(verdict.confidence, 1.0);

        let verdict =
            parse_verdict(r#"{"approved": false, "reason": "off topic", "confidence": -0.2}"#)
                .unwrap();
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn rejects_non_json_content() {
        assert!(matches!(
            parse_verdict("the video looks fine to me"),
            Err(OpenAiError::MalformedVerdict(_))
        ));
    }
}

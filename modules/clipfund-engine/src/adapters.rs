//! Trait implementations wiring the vendor clients into the pipeline seams.

use async_trait::async_trait;
use bytes::Bytes;

use clipfund_common::{EngineError, EngineResult, Verdict};
use deepgram_client::{DeepgramClient, TranscribeOptions};
use openai_client::{EvaluationRequest, OpenAiClient};

use crate::traits::{EvaluationInput, Evaluator, Transcriber};

#[async_trait]
impl Transcriber for DeepgramClient {
    async fn transcribe(&self, audio: Bytes, mime_type: &str) -> EngineResult<String> {
        DeepgramClient::transcribe(self, audio, mime_type, &TranscribeOptions::default())
            .await
            .map_err(|e| EngineError::external("transcription", e))
    }
}

#[async_trait]
impl Evaluator for OpenAiClient {
    async fn evaluate(&self, input: &EvaluationInput) -> EngineResult<Verdict> {
        let request = EvaluationRequest {
            campaign_title: input.campaign_title.clone(),
            guidelines: input.guidelines.clone(),
            video_outline: input.video_outline.clone(),
            transcript: input.transcript.clone(),
        };
        let verdict = OpenAiClient::evaluate(self, &request)
            .await
            .map_err(|e| EngineError::external("evaluation", e))?;

        Ok(Verdict {
            approved: verdict.approved,
            reason: verdict.reason,
            confidence: verdict.confidence,
        })
    }
}

//! Seams between the submission pipeline and its collaborators. Production
//! implementations live in `fetch`/`audio`/`adapters` and in
//! `clipfund-store`; tests inject in-memory fakes.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use uuid::Uuid;

use clipfund_common::{
    EngineResult, NotificationKind, SubmissionContext, SubmissionStatus, Verdict,
};

/// Retrieves a video's bytes, either from an absolute URL or from the blob
/// store by key.
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    async fn fetch_url(&self, url: &str) -> EngineResult<Bytes>;
    async fn fetch_object(&self, key: &str) -> EngineResult<Bytes>;
}

/// Produces a mono 16 kHz PCM16 audio clip from a video file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, input: &Path, output: &Path) -> EngineResult<()>;
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio buffer. An absent/empty transcript is an error,
    /// never an empty-string success.
    async fn transcribe(&self, audio: Bytes, mime_type: &str) -> EngineResult<String>;
}

/// Campaign context handed to the evaluation service.
#[derive(Debug, Clone)]
pub struct EvaluationInput {
    pub campaign_title: String,
    pub guidelines: String,
    pub video_outline: String,
    pub transcript: String,
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, input: &EvaluationInput) -> EngineResult<Verdict>;
}

/// Persistence surface the pipeline writes through. All pipeline results
/// are side effects on the submission row.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Submission joined with campaign and brand. Distinguishes a missing
    /// row (`SubmissionNotFound`) from a row whose campaign/brand join is
    /// null (`CampaignDataNotFound`).
    async fn load_context(&self, submission_id: Uuid) -> EngineResult<SubmissionContext>;

    /// Moderation did not act: write transcription + processed_at only,
    /// leaving status untouched.
    async fn save_transcription_only(
        &self,
        submission_id: Uuid,
        transcript: &str,
    ) -> EngineResult<()>;

    /// Moderation acted: status, verdict, transcription, and processed_at
    /// are written together.
    async fn save_moderated(
        &self,
        submission_id: Uuid,
        status: SubmissionStatus,
        verdict: &Verdict,
        transcript: &str,
    ) -> EngineResult<()>;

    /// Top-level pipeline failure, rendered human-readable.
    async fn record_processing_error(&self, submission_id: Uuid, message: &str)
        -> EngineResult<()>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        recipient_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        metadata: serde_json::Value,
    ) -> EngineResult<()>;
}

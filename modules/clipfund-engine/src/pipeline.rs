//! Submission Pipeline — fetch → extract audio → transcribe → load context
//! → auto-moderate → persist.
//!
//! Runs detached from the request that created the submission; every result
//! is a side effect on the submission row. A failure anywhere is caught at
//! the top, rendered human-readable, and written to `processing_error` —
//! nothing is rethrown because nobody is waiting.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use clipfund_common::policy::AUTO_MODERATION_CONFIDENCE_THRESHOLD;
use clipfund_common::{
    EngineResult, ModerationOutcome, NotificationKind, SubmissionContext, SubmissionStatus,
    VideoSource,
};

use crate::fetch::retry_with_backoff;
use crate::temp::SubmissionWorkspace;
use crate::traits::{
    AudioExtractor, EvaluationInput, Evaluator, NotificationSink, SubmissionStore, Transcriber,
    VideoFetcher,
};

/// Bundles the injected collaborators for the pipeline. Each stage method
/// borrows `&self` to access them.
pub struct SubmissionPipeline {
    fetcher: Arc<dyn VideoFetcher>,
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
    evaluator: Arc<dyn Evaluator>,
    store: Arc<dyn SubmissionStore>,
    notifier: Arc<dyn NotificationSink>,
}

impl SubmissionPipeline {
    pub fn new(
        fetcher: Arc<dyn VideoFetcher>,
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        evaluator: Arc<dyn Evaluator>,
        store: Arc<dyn SubmissionStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            transcriber,
            evaluator,
            store,
            notifier,
        }
    }

    /// Detached entry point. Catches every failure and records it on the
    /// submission; never returns an error to the (absent) caller.
    pub async fn process(&self, submission_id: Uuid, source: VideoSource) {
        if let Err(e) = self.run(submission_id, source).await {
            let message = e.to_string();
            warn!(submission_id = %submission_id, error = %message, "Pipeline failed");
            if let Err(persist_err) = self
                .store
                .record_processing_error(submission_id, &message)
                .await
            {
                warn!(
                    submission_id = %submission_id,
                    error = %persist_err,
                    "Could not record processing error"
                );
            }
        }
    }

    async fn run(&self, submission_id: Uuid, source: VideoSource) -> EngineResult<()> {
        let ctx = self.store.load_context(submission_id).await?;

        // Re-entry policy: a submission that already has a transcription was
        // fully processed; running again is a no-op, nothing is overwritten.
        if ctx.submission.transcription.is_some() {
            info!(submission_id = %submission_id, "Transcription already present, skipping");
            return Ok(());
        }

        // Workspace drop removes the temp files on every exit path below.
        let workspace = SubmissionWorkspace::create(submission_id)?;

        let video = match &source {
            VideoSource::Url(url) => self.fetcher.fetch_url(url).await?,
            VideoSource::StorageKey(key) => self.fetcher.fetch_object(key).await?,
        };
        tokio::fs::write(workspace.video_path(), &video)
            .await
            .map_err(|e| clipfund_common::EngineError::external("temp storage", e))?;

        self.extractor
            .extract(&workspace.video_path(), &workspace.audio_path())
            .await?;

        let audio: bytes::Bytes = tokio::fs::read(workspace.audio_path())
            .await
            .map_err(|e| clipfund_common::EngineError::external("temp storage", e))?
            .into();
        // Transcription is an idempotent read, safe to retry like the fetch.
        let transcript = retry_with_backoff("transcription", || {
            self.transcriber.transcribe(audio.clone(), "audio/wav")
        })
        .await?;

        let outcome = if ctx.brand.auto_approval_enabled {
            self.moderate(&ctx, &transcript).await
        } else {
            ModerationOutcome::NoAction
        };

        match outcome {
            ModerationOutcome::Acted { status, verdict } => {
                self.store
                    .save_moderated(submission_id, status, &verdict, &transcript)
                    .await?;
                self.notify_creator(&ctx, status, &verdict.reason).await;
                info!(
                    submission_id = %submission_id,
                    status = %status,
                    confidence = verdict.confidence,
                    "Submission auto-moderated"
                );
            }
            ModerationOutcome::NoAction => {
                self.store
                    .save_transcription_only(submission_id, &transcript)
                    .await?;
                info!(submission_id = %submission_id, "Transcription saved, moderation pending");
            }
        }

        Ok(())
    }

    /// Auto-moderation policy: delegate to the evaluation service, act only
    /// at or above the confidence threshold. An evaluation failure never
    /// aborts the pipeline — it falls through to the transcription-only
    /// path.
    async fn moderate(&self, ctx: &SubmissionContext, transcript: &str) -> ModerationOutcome {
        let input = EvaluationInput {
            campaign_title: ctx.campaign.title.clone(),
            guidelines: ctx.campaign.guidelines.clone(),
            video_outline: ctx.campaign.video_outline.clone(),
            transcript: transcript.to_string(),
        };

        let verdict = match self.evaluator.evaluate(&input).await {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    submission_id = %ctx.submission.id,
                    error = %e,
                    "Evaluation failed, skipping auto-moderation"
                );
                return ModerationOutcome::NoAction;
            }
        };

        if verdict.confidence < AUTO_MODERATION_CONFIDENCE_THRESHOLD {
            info!(
                submission_id = %ctx.submission.id,
                confidence = verdict.confidence,
                "Verdict below confidence threshold, no action"
            );
            return ModerationOutcome::NoAction;
        }

        let status = if verdict.approved {
            SubmissionStatus::Approved
        } else {
            SubmissionStatus::Rejected
        };

        ModerationOutcome::Acted { status, verdict }
    }

    /// Notification failure is logged, never fatal: the moderation result is
    /// already persisted by the time we get here.
    async fn notify_creator(&self, ctx: &SubmissionContext, status: SubmissionStatus, reason: &str) {
        let (kind, title, message) = match status {
            SubmissionStatus::Approved => (
                NotificationKind::SubmissionApproved,
                "Submission approved",
                format!("Your submission to \"{}\" was approved.", ctx.campaign.title),
            ),
            _ => (
                NotificationKind::SubmissionRejected,
                "Submission rejected",
                format!(
                    "Your submission to \"{}\" was rejected: {}",
                    ctx.campaign.title, reason
                ),
            ),
        };

        let metadata = serde_json::json!({
            "submission_id": ctx.submission.id,
            "campaign_id": ctx.campaign.id,
        });

        if let Err(e) = self
            .notifier
            .notify(ctx.submission.creator_id, kind, title, &message, metadata)
            .await
        {
            warn!(
                submission_id = %ctx.submission.id,
                error = %e,
                "Failed to emit moderation notification"
            );
        }
    }
}

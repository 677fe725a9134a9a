//! Pipeline behavior tests against in-memory collaborators: moderation
//! policy, persistence paths, failure recording, and re-entry.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use clipfund_common::{
    Brand, Campaign, EngineError, EngineResult, NotificationKind, PayoutStatus, Submission,
    SubmissionContext, SubmissionStatus, Verdict, VideoSource,
};
use clipfund_engine::traits::{
    AudioExtractor, EvaluationInput, Evaluator, NotificationSink, SubmissionStore, Transcriber,
    VideoFetcher,
};
use clipfund_engine::SubmissionPipeline;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct FakeFetcher {
    calls: AtomicU32,
}

#[async_trait]
impl VideoFetcher for FakeFetcher {
    async fn fetch_url(&self, _url: &str) -> EngineResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from_static(b"fake video bytes"))
    }

    async fn fetch_object(&self, _key: &str) -> EngineResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from_static(b"fake video bytes"))
    }
}

struct FakeExtractor;

#[async_trait]
impl AudioExtractor for FakeExtractor {
    async fn extract(&self, _input: &Path, output: &Path) -> EngineResult<()> {
        std::fs::write(output, b"fake pcm audio")
            .map_err(|e| EngineError::external("ffmpeg", e))?;
        Ok(())
    }
}

struct FakeTranscriber {
    result: Result<String, String>,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _audio: Bytes, _mime_type: &str) -> EngineResult<String> {
        self.result
            .clone()
            .map_err(|message| EngineError::ExternalService {
                service: "transcription".into(),
                message,
            })
    }
}

struct FakeEvaluator {
    result: Result<Verdict, String>,
    calls: AtomicU32,
}

#[async_trait]
impl Evaluator for FakeEvaluator {
    async fn evaluate(&self, _input: &EvaluationInput) -> EngineResult<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result
            .clone()
            .map_err(|message| EngineError::ExternalService {
                service: "evaluation".into(),
                message,
            })
    }
}

#[derive(Default)]
struct StoreState {
    transcription_only: Option<String>,
    moderated: Option<(SubmissionStatus, Verdict, String)>,
    recorded_errors: Vec<String>,
}

struct MemoryStore {
    context: Result<SubmissionContext, &'static str>,
    state: Mutex<StoreState>,
}

impl MemoryStore {
    fn new(context: Result<SubmissionContext, &'static str>) -> Self {
        Self {
            context,
            state: Mutex::new(StoreState::default()),
        }
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn load_context(&self, _submission_id: Uuid) -> EngineResult<SubmissionContext> {
        match &self.context {
            Ok(ctx) => Ok(ctx.clone()),
            Err("submission") => Err(EngineError::SubmissionNotFound),
            Err(_) => Err(EngineError::CampaignDataNotFound),
        }
    }

    async fn save_transcription_only(
        &self,
        _submission_id: Uuid,
        transcript: &str,
    ) -> EngineResult<()> {
        self.state.lock().unwrap().transcription_only = Some(transcript.to_string());
        Ok(())
    }

    async fn save_moderated(
        &self,
        _submission_id: Uuid,
        status: SubmissionStatus,
        verdict: &Verdict,
        transcript: &str,
    ) -> EngineResult<()> {
        self.state.lock().unwrap().moderated =
            Some((status, verdict.clone(), transcript.to_string()));
        Ok(())
    }

    async fn record_processing_error(
        &self,
        _submission_id: Uuid,
        message: &str,
    ) -> EngineResult<()> {
        self.state
            .lock()
            .unwrap()
            .recorded_errors
            .push(message.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct FakeNotifier {
    sent: Mutex<Vec<(Uuid, NotificationKind, String)>>,
}

#[async_trait]
impl NotificationSink for FakeNotifier {
    async fn notify(
        &self,
        recipient_id: Uuid,
        kind: NotificationKind,
        _title: &str,
        message: &str,
        _metadata: serde_json::Value,
    ) -> EngineResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient_id, kind, message.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

fn make_context(auto_approval_enabled: bool, transcription: Option<&str>) -> SubmissionContext {
    let brand_id = Uuid::new_v4();
    let campaign_id = Uuid::new_v4();
    SubmissionContext {
        submission: Submission {
            id: Uuid::new_v4(),
            campaign_id,
            creator_id: Uuid::new_v4(),
            video_url: Some("https://cdn.example.com/v.mp4".into()),
            file_path: None,
            status: SubmissionStatus::Pending,
            transcription: transcription.map(String::from),
            auto_moderation_result: None,
            processing_error: None,
            processed_at: None,
            views: 0,
            payout_due_date: None,
            payout_status: PayoutStatus::Unpaid,
            payout_amount: None,
            creator_amount: None,
            created_at: Utc::now(),
        },
        campaign: Campaign {
            id: campaign_id,
            brand_id,
            title: "Spring launch".into(),
            guidelines: "Mention the product by name.".into(),
            video_outline: "Unboxing and first impressions.".into(),
            budget_pool: 500.0,
            remaining_budget: Some(500.0),
            rpm: 0.65,
            referral_bonus_rate: 0.65,
            has_insufficient_budget: false,
        },
        brand: Brand {
            id: brand_id,
            stripe_customer_id: Some("cus_1".into()),
            payment_verified: true,
            auto_approval_enabled,
        },
    }
}

struct Harness {
    pipeline: SubmissionPipeline,
    store: Arc<MemoryStore>,
    notifier: Arc<FakeNotifier>,
    fetcher: Arc<FakeFetcher>,
    evaluator: Arc<FakeEvaluator>,
}

fn build(
    context: Result<SubmissionContext, &'static str>,
    transcriber: FakeTranscriber,
    evaluator: FakeEvaluator,
) -> Harness {
    let store = Arc::new(MemoryStore::new(context));
    let notifier = Arc::new(FakeNotifier::default());
    let fetcher = Arc::new(FakeFetcher {
        calls: AtomicU32::new(0),
    });
    let evaluator = Arc::new(evaluator);

    let pipeline = SubmissionPipeline::new(
        fetcher.clone(),
        Arc::new(FakeExtractor),
        Arc::new(transcriber),
        evaluator.clone(),
        store.clone(),
        notifier.clone(),
    );

    Harness {
        pipeline,
        store,
        notifier,
        fetcher,
        evaluator,
    }
}

fn ok_transcriber() -> FakeTranscriber {
    FakeTranscriber {
        result: Ok("we unbox the product and talk about it".into()),
    }
}

fn verdict(approved: bool, confidence: f64) -> FakeEvaluator {
    FakeEvaluator {
        result: Ok(Verdict {
            approved,
            reason: "guideline check".into(),
            confidence,
        }),
        calls: AtomicU32::new(0),
    }
}

// ---------------------------------------------------------------------------
// Moderation policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approves_at_confidence_threshold() {
    let ctx = make_context(true, None);
    let submission_id = ctx.submission.id;
    let creator_id = ctx.submission.creator_id;
    let h = build(Ok(ctx), ok_transcriber(), verdict(true, 0.8));

    h.pipeline
        .process(submission_id, VideoSource::Url("https://cdn.example.com/v.mp4".into()))
        .await;

    let state = h.store.state.lock().unwrap();
    let (status, verdict, transcript) = state.moderated.as_ref().expect("moderation should act");
    assert_eq!(*status, SubmissionStatus::Approved);
    assert_eq!(verdict.confidence, 0.8);
    assert_eq!(transcript, "we unbox the product and talk about it");
    assert!(state.transcription_only.is_none());
    assert!(state.recorded_errors.is_empty());

    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, creator_id);
    assert_eq!(sent[0].1, NotificationKind::SubmissionApproved);
}

#[tokio::test]
async fn below_threshold_saves_transcription_only() {
    let ctx = make_context(true, None);
    let submission_id = ctx.submission.id;
    let h = build(Ok(ctx), ok_transcriber(), verdict(true, 0.79));

    h.pipeline
        .process(submission_id, VideoSource::Url("https://cdn.example.com/v.mp4".into()))
        .await;

    let state = h.store.state.lock().unwrap();
    assert!(state.moderated.is_none());
    assert_eq!(
        state.transcription_only.as_deref(),
        Some("we unbox the product and talk about it")
    );
    assert!(h.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejection_verdict_sets_rejected_and_notifies() {
    let ctx = make_context(true, None);
    let submission_id = ctx.submission.id;
    let h = build(Ok(ctx), ok_transcriber(), verdict(false, 0.95));

    h.pipeline
        .process(submission_id, VideoSource::Url("https://cdn.example.com/v.mp4".into()))
        .await;

    let state = h.store.state.lock().unwrap();
    let (status, _, _) = state.moderated.as_ref().expect("moderation should act");
    assert_eq!(*status, SubmissionStatus::Rejected);

    let sent = h.notifier.sent.lock().unwrap();
    assert_eq!(sent[0].1, NotificationKind::SubmissionRejected);
}

#[tokio::test]
async fn auto_approval_disabled_skips_evaluation() {
    let ctx = make_context(false, None);
    let submission_id = ctx.submission.id;
    let h = build(Ok(ctx), ok_transcriber(), verdict(true, 0.99));

    h.pipeline
        .process(submission_id, VideoSource::Url("https://cdn.example.com/v.mp4".into()))
        .await;

    assert_eq!(h.evaluator.calls.load(Ordering::SeqCst), 0);
    let state = h.store.state.lock().unwrap();
    assert!(state.moderated.is_none());
    assert!(state.transcription_only.is_some());
}

#[tokio::test]
async fn evaluation_failure_is_swallowed() {
    let ctx = make_context(true, None);
    let submission_id = ctx.submission.id;
    let h = build(
        Ok(ctx),
        ok_transcriber(),
        FakeEvaluator {
            result: Err("model overloaded".into()),
            calls: AtomicU32::new(0),
        },
    );

    h.pipeline
        .process(submission_id, VideoSource::Url("https://cdn.example.com/v.mp4".into()))
        .await;

    let state = h.store.state.lock().unwrap();
    // Evaluation failing must not halt the pipeline or record an error.
    assert!(state.recorded_errors.is_empty());
    assert!(state.moderated.is_none());
    assert!(state.transcription_only.is_some());
}

// ---------------------------------------------------------------------------
// Failure recording
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transcription_failure_is_recorded() {
    let ctx = make_context(true, None);
    let submission_id = ctx.submission.id;
    let h = build(
        Ok(ctx),
        FakeTranscriber {
            result: Err("service unavailable".into()),
        },
        verdict(true, 0.9),
    );

    h.pipeline
        .process(submission_id, VideoSource::Url("https://cdn.example.com/v.mp4".into()))
        .await;

    let state = h.store.state.lock().unwrap();
    assert_eq!(state.recorded_errors.len(), 1);
    assert!(state.recorded_errors[0].contains("transcription"));
    assert!(state.transcription_only.is_none());
    assert!(state.moderated.is_none());
}

#[tokio::test]
async fn missing_submission_and_missing_campaign_are_distinct() {
    let h = build(Err("submission"), ok_transcriber(), verdict(true, 0.9));
    h.pipeline
        .process(Uuid::new_v4(), VideoSource::StorageKey("uploads/v.mp4".into()))
        .await;
    assert_eq!(
        h.store.state.lock().unwrap().recorded_errors[0],
        "submission details not found"
    );

    let h = build(Err("campaign"), ok_transcriber(), verdict(true, 0.9));
    h.pipeline
        .process(Uuid::new_v4(), VideoSource::StorageKey("uploads/v.mp4".into()))
        .await;
    assert_eq!(
        h.store.state.lock().unwrap().recorded_errors[0],
        "campaign data not found"
    );
}

// ---------------------------------------------------------------------------
// Re-entry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reentry_with_existing_transcription_is_noop() {
    let ctx = make_context(true, Some("already transcribed"));
    let submission_id = ctx.submission.id;
    let h = build(Ok(ctx), ok_transcriber(), verdict(true, 0.9));

    h.pipeline
        .process(submission_id, VideoSource::Url("https://cdn.example.com/v.mp4".into()))
        .await;

    // Nothing fetched, nothing written.
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
    let state = h.store.state.lock().unwrap();
    assert!(state.transcription_only.is_none());
    assert!(state.moderated.is_none());
    assert!(state.recorded_errors.is_empty());
}

// ---------------------------------------------------------------------------
// Storage-key sourced submissions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn storage_key_source_uses_object_fetch() {
    let ctx = make_context(false, None);
    let submission_id = ctx.submission.id;
    let h = build(Ok(ctx), ok_transcriber(), verdict(true, 0.9));

    h.pipeline
        .process(submission_id, VideoSource::StorageKey("uploads/v.mp4".into()))
        .await;

    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(h.store.state.lock().unwrap().transcription_only.is_some());
}

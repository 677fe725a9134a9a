//! REST handlers: create a submission (validation first, then hand off to
//! the pipeline worker), dispatch a payout, confirm a payout.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use clipfund_common::{EngineError, PayoutError, VideoSource};

use crate::AppState;

#[derive(Deserialize)]
pub struct CreateSubmissionRequest {
    pub campaign_id: Uuid,
    pub creator_id: Uuid,
    pub video_url: Option<String>,
    pub file_path: Option<String>,
}

/// Validate the XOR video-source rule and the URL shape. Returns the parsed
/// source or a validation rejection.
pub fn validate_source(
    video_url: Option<String>,
    file_path: Option<String>,
) -> Result<VideoSource, EngineError> {
    let source = VideoSource::from_columns(
        video_url.filter(|s| !s.trim().is_empty()),
        file_path.filter(|s| !s.trim().is_empty()),
    )
    .ok_or_else(|| {
        EngineError::Validation("exactly one of video_url or file_path must be provided".into())
    })?;

    if let VideoSource::Url(url) = &source {
        let parsed = url::Url::parse(url)
            .map_err(|_| EngineError::Validation("invalid video_url".into()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(EngineError::Validation(
                "video_url must use http or https".into(),
            ));
        }
    }

    Ok(source)
}

pub async fn api_create_submission(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSubmissionRequest>,
) -> impl IntoResponse {
    // Boundary validation happens before any pipeline work starts.
    let source = match validate_source(body.video_url, body.file_path) {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response();
        }
    };

    match state.store.campaign_exists(body.campaign_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "campaign not found"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Campaign lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let submission_id = match state
        .store
        .insert_submission(body.campaign_id, body.creator_id, &source)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to insert submission");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Fire-and-forget: the response does not wait for processing.
    state.worker.spawn(submission_id, source);

    info!(submission_id = %submission_id, campaign_id = %body.campaign_id, "Submission accepted");

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "status": "accepted",
            "submission_id": submission_id.to_string(),
        })),
    )
        .into_response()
}

pub async fn api_process_payout(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.orchestrator.process_payout(submission_id).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "transaction_id": receipt.transaction_id.to_string(),
                "client_secret": receipt.client_secret,
                "creator_payment": receipt.creator_payment,
                "total_cost": receipt.total_cost,
            })),
        )
            .into_response(),
        Err(e) => payout_error_response(e),
    }
}

#[derive(Deserialize)]
pub struct ConfirmPayoutRequest {
    pub payment_intent_id: String,
}

pub async fn api_confirm_payout(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<Uuid>,
    Json(body): Json<ConfirmPayoutRequest>,
) -> impl IntoResponse {
    match state
        .orchestrator
        .confirm_payout(submission_id, &body.payment_intent_id)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "confirmed"})),
        )
            .into_response(),
        Err(e) => payout_error_response(e),
    }
}

/// Map payout errors onto response codes: caller mistakes and refused gates
/// are 4xx, processor trouble is 502, storage trouble is 500.
fn payout_error_response(e: PayoutError) -> axum::response::Response {
    let status = match &e {
        PayoutError::NotFound(_) => StatusCode::NOT_FOUND,
        PayoutError::Validation(_) => StatusCode::BAD_REQUEST,
        PayoutError::PaymentSetup(_)
        | PayoutError::InsufficientBudget
        | PayoutError::CreatorNotPayable(_)
        | PayoutError::BelowMinimum { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PayoutError::NotSettled(_) => StatusCode::CONFLICT,
        PayoutError::Processor(_) => StatusCode::BAD_GATEWAY,
        PayoutError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(serde_json::json!({"error": e.to_string()}))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_source() {
        assert!(matches!(
            validate_source(None, None),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn rejects_both_sources() {
        assert!(validate_source(
            Some("https://cdn.example.com/v.mp4".into()),
            Some("uploads/v.mp4".into())
        )
        .is_err());
    }

    #[test]
    fn rejects_non_http_url() {
        assert!(validate_source(Some("ftp://example.com/v.mp4".into()), None).is_err());
        assert!(validate_source(Some("not a url".into()), None).is_err());
    }

    #[test]
    fn accepts_url_source() {
        let source = validate_source(Some("https://cdn.example.com/v.mp4".into()), None).unwrap();
        assert_eq!(
            source,
            VideoSource::Url("https://cdn.example.com/v.mp4".into())
        );
    }

    #[test]
    fn accepts_storage_key_source() {
        let source = validate_source(None, Some("uploads/v.mp4".into())).unwrap();
        assert_eq!(source, VideoSource::StorageKey("uploads/v.mp4".into()));
    }

    #[test]
    fn blank_strings_count_as_absent() {
        assert!(validate_source(Some("  ".into()), Some("".into())).is_err());
        let source = validate_source(Some("".into()), Some("uploads/v.mp4".into())).unwrap();
        assert_eq!(source, VideoSource::StorageKey("uploads/v.mp4".into()));
    }
}

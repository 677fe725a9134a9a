//! Typed errors for the submission pipeline and the payout path.

use thiserror::Error;

/// Errors raised while processing a submission through the pipeline.
///
/// Everything here is caught at the top of the detached pipeline task and
/// persisted to the submission's `processing_error` column; nothing
/// propagates to the request that created the submission.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or malformed input, rejected before any pipeline work starts.
    #[error("validation error: {0}")]
    Validation(String),

    /// An external collaborator (fetch, transcode, transcription) failed.
    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    /// Submission row itself is missing.
    #[error("submission details not found")]
    SubmissionNotFound,

    /// Submission row exists but the campaign/brand join came back empty.
    #[error("campaign data not found")]
    CampaignDataNotFound,

    /// Persistence failure.
    #[error("database error: {0}")]
    Db(String),
}

impl EngineError {
    pub fn external(service: impl Into<String>, message: impl std::fmt::Display) -> Self {
        EngineError::ExternalService {
            service: service.into(),
            message: message.to_string(),
        }
    }
}

/// Errors surfaced synchronously to the payout-initiating caller.
#[derive(Debug, Error)]
pub enum PayoutError {
    /// Brand has no verified payment setup or no processor customer.
    #[error("brand payment setup incomplete: {0}")]
    PaymentSetup(String),

    /// Capped creator payment is zero; the campaign pool is exhausted.
    #[error("insufficient campaign budget for payout")]
    InsufficientBudget,

    /// Creator has no active transfer destination.
    #[error("creator is not payable: {0}")]
    CreatorNotPayable(String),

    /// Eligibility gate refused the payout; the submission stays approved.
    #[error(
        "payout below minimum: creator payment {creator_payment:.2} (min {min_payment:.2}), \
         aggregate earnings {aggregate:.2} (min {min_aggregate:.2})"
    )]
    BelowMinimum {
        creator_payment: f64,
        min_payment: f64,
        aggregate: f64,
        min_aggregate: f64,
    },

    /// The payment processor call itself failed.
    #[error("payment processor error: {0}")]
    Processor(String),

    /// Confirmation requested but the processor reports the intent unsettled.
    #[error("payment intent not settled: {0}")]
    NotSettled(String),

    /// Submission / campaign / creator / brand row missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Payout requested from an illegal state.
    #[error("validation error: {0}")]
    Validation(String),

    /// Persistence failure.
    #[error("database error: {0}")]
    Db(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
pub type PayoutResult<T> = std::result::Result<T, PayoutError>;

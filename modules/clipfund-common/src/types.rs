use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Lifecycle of a submission. Transitions only move forward:
/// pending → {approved | rejected} → payment_pending → fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
    PaymentPending,
    Fulfilled,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::Approved => write!(f, "approved"),
            SubmissionStatus::Rejected => write!(f, "rejected"),
            SubmissionStatus::PaymentPending => write!(f, "payment_pending"),
            SubmissionStatus::Fulfilled => write!(f, "fulfilled"),
        }
    }
}

impl SubmissionStatus {
    /// Whether `next` is a legal forward transition from `self`.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Approved, PaymentPending)
                | (PaymentPending, Fulfilled)
        )
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            "payment_pending" => Ok(SubmissionStatus::PaymentPending),
            "fulfilled" => Ok(SubmissionStatus::Fulfilled),
            other => Err(format!("unknown submission status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Unpaid,
    Pending,
    Paid,
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutStatus::Unpaid => write!(f, "unpaid"),
            PayoutStatus::Pending => write!(f, "pending"),
            PayoutStatus::Paid => write!(f, "paid"),
        }
    }
}

impl std::str::FromStr for PayoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PayoutStatus::Unpaid),
            "pending" => Ok(PayoutStatus::Pending),
            "paid" => Ok(PayoutStatus::Paid),
            other => Err(format!("unknown payout status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SubmissionApproved,
    SubmissionRejected,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::SubmissionApproved => write!(f, "submission_approved"),
            NotificationKind::SubmissionRejected => write!(f, "submission_rejected"),
        }
    }
}

// --- Video source ---

/// Where a submission's video bytes live. Exactly one of the two is set at
/// creation; enforced at the API boundary and by a DB CHECK constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    /// Absolute http(s) URL hosted outside our blob store.
    Url(String),
    /// Key within our blob store bucket.
    StorageKey(String),
}

impl VideoSource {
    /// Build from the nullable column pair, preserving the XOR rule.
    pub fn from_columns(video_url: Option<String>, file_path: Option<String>) -> Option<Self> {
        match (video_url, file_path) {
            (Some(url), None) => Some(VideoSource::Url(url)),
            (None, Some(key)) => Some(VideoSource::StorageKey(key)),
            _ => None,
        }
    }
}

// --- Moderation verdict ---

/// Structured verdict from the evaluation service. Stored verbatim on the
/// submission for audit/UI display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub approved: bool,
    pub reason: String,
    /// Self-reported certainty in [0, 1]. Only acted on at or above the
    /// configured threshold.
    pub confidence: f64,
}

/// What the pipeline decided to do with a verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum ModerationOutcome {
    /// Confidence qualified; status was set and the verdict recorded.
    Acted {
        status: SubmissionStatus,
        verdict: Verdict,
    },
    /// Auto-approval disabled, confidence too low, or evaluation failed.
    NoAction,
}

// --- Row types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub creator_id: Uuid,
    pub video_url: Option<String>,
    pub file_path: Option<String>,
    pub status: SubmissionStatus,
    pub transcription: Option<String>,
    pub auto_moderation_result: Option<serde_json::Value>,
    pub processing_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub views: i64,
    pub payout_due_date: Option<DateTime<Utc>>,
    pub payout_status: PayoutStatus,
    pub payout_amount: Option<f64>,
    pub creator_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Campaign {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub title: String,
    pub guidelines: String,
    pub video_outline: String,
    /// Original funded pool; never mutated after creation.
    pub budget_pool: f64,
    /// Nullable; `budget_pool` is the fallback when unset.
    pub remaining_budget: Option<f64>,
    /// Rate paid per 1000 views.
    pub rpm: f64,
    pub referral_bonus_rate: f64,
    pub has_insufficient_budget: bool,
}

impl Campaign {
    pub fn effective_remaining_budget(&self) -> f64 {
        self.remaining_budget.unwrap_or(self.budget_pool)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Creator {
    pub id: Uuid,
    pub stripe_account_id: Option<String>,
    pub stripe_account_status: Option<String>,
    pub referred_by: Option<Uuid>,
    pub total_earned: f64,
}

impl Creator {
    /// A creator can receive transfers only with an active connected account.
    pub fn payable(&self) -> bool {
        self.stripe_account_id.is_some() && self.stripe_account_status.as_deref() == Some("active")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Brand {
    pub id: Uuid,
    pub stripe_customer_id: Option<String>,
    pub payment_verified: bool,
    pub auto_approval_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub brand_id: Uuid,
    /// Gross amount billed to the brand, service fee included.
    pub amount: f64,
    pub service_fee: f64,
    pub referrer_amount: f64,
    pub referrer_id: Option<Uuid>,
    pub stripe_payment_intent_id: String,
    pub status: TransactionStatus,
    pub creator_payout_status: PayoutStatus,
    pub created_at: DateTime<Utc>,
}

/// A submission joined with the campaign and brand context the pipeline
/// needs: campaign text for the evaluation prompt plus the brand's
/// auto-approval flag.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub submission: Submission,
    pub campaign: Campaign,
    pub brand: Brand,
}

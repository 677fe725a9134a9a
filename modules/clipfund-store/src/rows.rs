//! Raw row types and their conversions into domain structs. Status columns
//! are TEXT in Postgres; parsing happens once, here.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use clipfund_common::{PayoutStatus, Submission, SubmissionStatus, Transaction, TransactionStatus};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubmissionRow {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub creator_id: Uuid,
    pub video_url: Option<String>,
    pub file_path: Option<String>,
    pub status: String,
    pub transcription: Option<String>,
    pub auto_moderation_result: Option<serde_json::Value>,
    pub processing_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub views: i64,
    pub payout_due_date: Option<DateTime<Utc>>,
    pub payout_status: String,
    pub payout_amount: Option<f64>,
    pub creator_amount: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = String;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        Ok(Submission {
            id: row.id,
            campaign_id: row.campaign_id,
            creator_id: row.creator_id,
            video_url: row.video_url,
            file_path: row.file_path,
            status: row.status.parse::<SubmissionStatus>()?,
            transcription: row.transcription,
            auto_moderation_result: row.auto_moderation_result,
            processing_error: row.processing_error,
            processed_at: row.processed_at,
            views: row.views,
            payout_due_date: row.payout_due_date,
            payout_status: row.payout_status.parse::<PayoutStatus>()?,
            payout_amount: row.payout_amount,
            creator_amount: row.creator_amount,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TransactionRow {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub brand_id: Uuid,
    pub amount: f64,
    pub service_fee: f64,
    pub referrer_amount: f64,
    pub referrer_id: Option<Uuid>,
    pub stripe_payment_intent_id: String,
    pub status: String,
    pub creator_payout_status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = String;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            submission_id: row.submission_id,
            brand_id: row.brand_id,
            amount: row.amount,
            service_fee: row.service_fee,
            referrer_amount: row.referrer_amount,
            referrer_id: row.referrer_id,
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            status: row.status.parse::<TransactionStatus>()?,
            creator_payout_status: row.creator_payout_status.parse::<PayoutStatus>()?,
            created_at: row.created_at,
        })
    }
}

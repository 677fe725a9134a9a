//! PgStore — the persistence boundary for submissions, campaigns, payouts,
//! and notifications. Implements the engine and payout seam traits with
//! raw-SQL sqlx queries.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use clipfund_common::policy::LOW_BUDGET_THRESHOLD;
use clipfund_common::{
    Brand, Campaign, Creator, EngineError, EngineResult, NotificationKind, PayoutError,
    PayoutResult, Submission, SubmissionContext, SubmissionStatus, Transaction, Verdict,
    VideoSource,
};
use clipfund_engine::traits::{NotificationSink, SubmissionStore};
use clipfund_payouts::traits::{NewTransaction, PayoutContext, PayoutStore};

use crate::rows::{SubmissionRow, TransactionRow};

const SUBMISSION_COLUMNS: &str = "id, campaign_id, creator_id, video_url, file_path, status, \
     transcription, auto_moderation_result, processing_error, processed_at, views, \
     payout_due_date, payout_status, payout_amount, creator_amount, created_at";

const CAMPAIGN_COLUMNS: &str = "id, brand_id, title, guidelines, video_outline, budget_pool, \
     remaining_budget, rpm, referral_bonus_rate, has_insufficient_budget";

const CREATOR_COLUMNS: &str =
    "id, stripe_account_id, stripe_account_status, referred_by, total_earned";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the schema migrations bundled with this crate.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_submission(&self, id: Uuid) -> Result<Option<Submission>, sqlx::Error> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(
                row.try_into().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            )),
            None => Ok(None),
        }
    }

    async fn fetch_campaign(&self, id: Uuid) -> Result<Option<Campaign>, sqlx::Error> {
        sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn fetch_brand(&self, id: Uuid) -> Result<Option<Brand>, sqlx::Error> {
        sqlx::query_as::<_, Brand>(
            "SELECT id, stripe_customer_id, payment_verified, auto_approval_enabled \
             FROM brands WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn fetch_creator(&self, id: Uuid) -> Result<Option<Creator>, sqlx::Error> {
        sqlx::query_as::<_, Creator>(&format!(
            "SELECT {CREATOR_COLUMNS} FROM creators WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    // --- API-facing helpers ---

    pub async fn campaign_exists(&self, id: Uuid) -> anyhow::Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM campaigns WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert a fresh `pending` submission row; the pipeline takes over from
    /// here.
    pub async fn insert_submission(
        &self,
        campaign_id: Uuid,
        creator_id: Uuid,
        source: &VideoSource,
    ) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        let (video_url, file_path) = match source {
            VideoSource::Url(url) => (Some(url.as_str()), None),
            VideoSource::StorageKey(key) => (None, Some(key.as_str())),
        };

        sqlx::query(
            "INSERT INTO submissions (id, campaign_id, creator_id, video_url, file_path) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(campaign_id)
        .bind(creator_id)
        .bind(video_url)
        .bind(file_path)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Engine traits
// ---------------------------------------------------------------------------

#[async_trait]
impl SubmissionStore for PgStore {
    async fn load_context(&self, submission_id: Uuid) -> EngineResult<SubmissionContext> {
        let submission = self
            .fetch_submission(submission_id)
            .await
            .map_err(|e| EngineError::Db(e.to_string()))?
            .ok_or(EngineError::SubmissionNotFound)?;

        // Row present but the joined relation missing is a distinct failure
        // from a missing submission.
        let campaign = self
            .fetch_campaign(submission.campaign_id)
            .await
            .map_err(|e| EngineError::Db(e.to_string()))?
            .ok_or(EngineError::CampaignDataNotFound)?;

        let brand = self
            .fetch_brand(campaign.brand_id)
            .await
            .map_err(|e| EngineError::Db(e.to_string()))?
            .ok_or(EngineError::CampaignDataNotFound)?;

        Ok(SubmissionContext {
            submission,
            campaign,
            brand,
        })
    }

    async fn save_transcription_only(
        &self,
        submission_id: Uuid,
        transcript: &str,
    ) -> EngineResult<()> {
        // `transcription IS NULL` guards the never-cleared invariant.
        sqlx::query(
            "UPDATE submissions SET transcription = $2, processed_at = now() \
             WHERE id = $1 AND transcription IS NULL",
        )
        .bind(submission_id)
        .bind(transcript)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Db(e.to_string()))?;
        Ok(())
    }

    async fn save_moderated(
        &self,
        submission_id: Uuid,
        status: SubmissionStatus,
        verdict: &Verdict,
        transcript: &str,
    ) -> EngineResult<()> {
        let verdict_json =
            serde_json::to_value(verdict).map_err(|e| EngineError::Db(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE submissions \
             SET status = $2, auto_moderation_result = $3, transcription = $4, \
                 processed_at = now() \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(submission_id)
        .bind(status.to_string())
        .bind(verdict_json)
        .bind(transcript)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Db(e.to_string()))?;

        // Status moved concurrently; the moderation result is stale but the
        // transcription must still land (it is never cleared once set).
        if result.rows_affected() == 0 {
            return self.save_transcription_only(submission_id, transcript).await;
        }
        Ok(())
    }

    async fn record_processing_error(
        &self,
        submission_id: Uuid,
        message: &str,
    ) -> EngineResult<()> {
        sqlx::query("UPDATE submissions SET processing_error = $2 WHERE id = $1")
            .bind(submission_id)
            .bind(message)
            .execute(&self.pool)
            .await
            .map_err(|e| EngineError::Db(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for PgStore {
    async fn notify(
        &self,
        recipient_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        metadata: serde_json::Value,
    ) -> EngineResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, recipient_id, kind, title, message, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(recipient_id)
        .bind(kind.to_string())
        .bind(title)
        .bind(message)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Db(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Payout trait
// ---------------------------------------------------------------------------

#[async_trait]
impl PayoutStore for PgStore {
    async fn load_payout_context(
        &self,
        submission_id: Uuid,
    ) -> PayoutResult<Option<PayoutContext>> {
        let db = |e: sqlx::Error| PayoutError::Db(e.to_string());

        let Some(submission) = self.fetch_submission(submission_id).await.map_err(db)? else {
            return Ok(None);
        };

        let campaign = self
            .fetch_campaign(submission.campaign_id)
            .await
            .map_err(db)?
            .ok_or_else(|| PayoutError::NotFound(format!("campaign {}", submission.campaign_id)))?;

        let brand = self
            .fetch_brand(campaign.brand_id)
            .await
            .map_err(db)?
            .ok_or_else(|| PayoutError::NotFound(format!("brand {}", campaign.brand_id)))?;

        let creator = self
            .fetch_creator(submission.creator_id)
            .await
            .map_err(db)?
            .ok_or_else(|| PayoutError::NotFound(format!("creator {}", submission.creator_id)))?;

        let referrer = match creator.referred_by {
            Some(referrer_id) => self.fetch_creator(referrer_id).await.map_err(db)?,
            None => None,
        };

        Ok(Some(PayoutContext {
            submission,
            campaign,
            brand,
            creator,
            referrer,
        }))
    }

    async fn aggregate_earnings(&self, creator_id: Uuid) -> PayoutResult<f64> {
        // Estimated earnings of every not-yet-paid-out submission, at each
        // campaign's rpm, rounded per submission like the allocator does.
        let total: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(ROUND((s.views * c.rpm / 1000.0)::numeric, 2)), 0)::float8 \
             FROM submissions s \
             JOIN campaigns c ON c.id = s.campaign_id \
             WHERE s.creator_id = $1 AND s.status IN ('pending', 'approved')",
        )
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PayoutError::Db(e.to_string()))?;
        Ok(total)
    }

    async fn remaining_budget(&self, campaign_id: Uuid) -> PayoutResult<f64> {
        sqlx::query_scalar(
            "SELECT COALESCE(remaining_budget, budget_pool)::float8 \
             FROM campaigns WHERE id = $1",
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PayoutError::Db(e.to_string()))?
        .ok_or_else(|| PayoutError::NotFound(format!("campaign {campaign_id}")))
    }

    async fn debit_budget(&self, campaign_id: Uuid, amount: f64) -> PayoutResult<bool> {
        // Conditional update serializes racing payouts on the same campaign:
        // the pool can never go negative, and a stale read simply misses.
        let result = sqlx::query(
            "UPDATE campaigns \
             SET remaining_budget = \
                     ROUND((COALESCE(remaining_budget, budget_pool) - $2)::numeric, 2), \
                 has_insufficient_budget = \
                     COALESCE(remaining_budget, budget_pool) - $2 < $3 \
             WHERE id = $1 AND COALESCE(remaining_budget, budget_pool) >= $2",
        )
        .bind(campaign_id)
        .bind(amount)
        .bind(LOW_BUDGET_THRESHOLD)
        .execute(&self.pool)
        .await
        .map_err(|e| PayoutError::Db(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn credit_budget(&self, campaign_id: Uuid, amount: f64) -> PayoutResult<()> {
        sqlx::query(
            "UPDATE campaigns \
             SET remaining_budget = ROUND( \
                     LEAST(budget_pool, COALESCE(remaining_budget, budget_pool) + $2)::numeric, 2), \
                 has_insufficient_budget = \
                     LEAST(budget_pool, COALESCE(remaining_budget, budget_pool) + $2) < $3 \
             WHERE id = $1",
        )
        .bind(campaign_id)
        .bind(amount)
        .bind(LOW_BUDGET_THRESHOLD)
        .execute(&self.pool)
        .await
        .map_err(|e| PayoutError::Db(e.to_string()))?;
        Ok(())
    }

    async fn insert_transaction(&self, tx: &NewTransaction) -> PayoutResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO transactions \
                 (id, submission_id, brand_id, amount, service_fee, referrer_amount, \
                  referrer_id, stripe_payment_intent_id, status, creator_payout_status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', 'pending')",
        )
        .bind(id)
        .bind(tx.submission_id)
        .bind(tx.brand_id)
        .bind(tx.amount)
        .bind(tx.service_fee)
        .bind(tx.referrer_amount)
        .bind(tx.referrer_id)
        .bind(&tx.stripe_payment_intent_id)
        .execute(&self.pool)
        .await
        .map_err(|e| PayoutError::Db(e.to_string()))?;
        Ok(id)
    }

    async fn mark_payment_pending(
        &self,
        submission_id: Uuid,
        payout_amount: f64,
        creator_amount: f64,
    ) -> PayoutResult<()> {
        let result = sqlx::query(
            "UPDATE submissions \
             SET status = 'payment_pending', payout_status = 'pending', \
                 payout_amount = $2, creator_amount = $3 \
             WHERE id = $1 AND status = 'approved'",
        )
        .bind(submission_id)
        .bind(payout_amount)
        .bind(creator_amount)
        .execute(&self.pool)
        .await
        .map_err(|e| PayoutError::Db(e.to_string()))?;

        if result.rows_affected() != 1 {
            return Err(PayoutError::Validation(
                "submission left the approved state during payout".into(),
            ));
        }
        Ok(())
    }

    async fn find_transaction_for_intent(
        &self,
        payment_intent_id: &str,
    ) -> PayoutResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, submission_id, brand_id, amount, service_fee, referrer_amount, \
                    referrer_id, stripe_payment_intent_id, status, creator_payout_status, \
                    created_at \
             FROM transactions WHERE stripe_payment_intent_id = $1",
        )
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PayoutError::Db(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(row.try_into().map_err(PayoutError::Db)?)),
            None => Ok(None),
        }
    }

    async fn complete_payout(
        &self,
        transaction_id: Uuid,
        submission_id: Uuid,
        referrer_credit: Option<(Uuid, f64)>,
    ) -> PayoutResult<()> {
        let db = |e: sqlx::Error| PayoutError::Db(e.to_string());
        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query(
            "UPDATE transactions SET status = 'completed', creator_payout_status = 'paid' \
             WHERE id = $1",
        )
        .bind(transaction_id)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        sqlx::query(
            "UPDATE submissions SET status = 'fulfilled', payout_status = 'paid' \
             WHERE id = $1 AND status = 'payment_pending'",
        )
        .bind(submission_id)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        if let Some((referrer_id, amount)) = referrer_credit {
            sqlx::query(
                "UPDATE creators \
                 SET total_earned = ROUND((total_earned + $2)::numeric, 2) \
                 WHERE id = $1",
            )
            .bind(referrer_id)
            .bind(amount)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }
}

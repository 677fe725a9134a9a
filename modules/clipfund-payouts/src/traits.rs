//! Seams between the transfer orchestrator and its collaborators.
//!
//! Implemented by `clipfund-store::PgStore` and the Stripe adapter in
//! production, and by in-memory fakes in tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use uuid::Uuid;

use clipfund_common::{Brand, Campaign, Creator, PayoutResult, Submission, Transaction};

/// Submission + everything the payout path needs joined alongside it.
#[derive(Debug, Clone)]
pub struct PayoutContext {
    pub submission: Submission,
    pub campaign: Campaign,
    pub brand: Brand,
    pub creator: Creator,
    /// Present when the creator's `referred_by` resolves to a profile.
    pub referrer: Option<Creator>,
}

/// A ledger row to be inserted with `status = pending`.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub submission_id: Uuid,
    pub brand_id: Uuid,
    pub amount: f64,
    pub service_fee: f64,
    pub referrer_amount: f64,
    pub referrer_id: Option<Uuid>,
    pub stripe_payment_intent_id: String,
}

#[async_trait]
pub trait PayoutStore: Send + Sync {
    async fn load_payout_context(&self, submission_id: Uuid)
        -> PayoutResult<Option<PayoutContext>>;

    /// Sum of pending+approved earnings across all of a creator's
    /// submissions, for the aggregate eligibility gate.
    async fn aggregate_earnings(&self, creator_id: Uuid) -> PayoutResult<f64>;

    /// Re-read the campaign's budget for a CAS retry.
    async fn remaining_budget(&self, campaign_id: Uuid) -> PayoutResult<f64>;

    /// Atomically deduct `amount` from the campaign pool, refreshing the
    /// insufficient-budget flag in the same statement. Returns `false`
    /// when the pool no longer covers the amount (CAS miss).
    async fn debit_budget(&self, campaign_id: Uuid, amount: f64) -> PayoutResult<bool>;

    /// Compensating credit for a debit whose downstream processor calls
    /// failed.
    async fn credit_budget(&self, campaign_id: Uuid, amount: f64) -> PayoutResult<()>;

    async fn insert_transaction(&self, tx: &NewTransaction) -> PayoutResult<Uuid>;

    /// Move the submission into `payment_pending` with its payout amounts.
    async fn mark_payment_pending(
        &self,
        submission_id: Uuid,
        payout_amount: f64,
        creator_amount: f64,
    ) -> PayoutResult<()>;

    async fn find_transaction_for_intent(
        &self,
        payment_intent_id: &str,
    ) -> PayoutResult<Option<Transaction>>;

    /// Confirmation: transaction → completed, submission → fulfilled, and
    /// the referrer's cumulative `total_earned` bumped when one was paid.
    async fn complete_payout(
        &self,
        transaction_id: Uuid,
        submission_id: Uuid,
        referrer_credit: Option<(Uuid, f64)>,
    ) -> PayoutResult<()>;
}

/// Handle returned from intent creation; the client secret goes back to the
/// payout caller for settlement.
#[derive(Debug, Clone)]
pub struct PaymentIntentHandle {
    pub id: String,
    pub client_secret: Option<String>,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_payment_intent(
        &self,
        customer_id: &str,
        amount_cents: i64,
        transfer_group: &str,
        metadata: &BTreeMap<String, String>,
        idempotency_key: &str,
    ) -> PayoutResult<PaymentIntentHandle>;

    async fn create_transfer(
        &self,
        destination: &str,
        amount_cents: i64,
        transfer_group: &str,
        metadata: &BTreeMap<String, String>,
        idempotency_key: &str,
    ) -> PayoutResult<String>;

    /// Whether the processor reports the intent settled.
    async fn payment_intent_succeeded(&self, intent_id: &str) -> PayoutResult<bool>;
}

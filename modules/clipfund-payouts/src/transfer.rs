//! Transfer Orchestrator — turns an approved submission into money movement.
//!
//! Sequence: gate everything first (payment setup, state, eligibility),
//! then atomically debit the campaign pool, then create the payment intent
//! and transfers, then write the ledger row and advance the submission. A
//! processor failure after the debit triggers an explicit compensating
//! credit so the pool is never left short with no money in flight.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use clipfund_common::money::{round2, to_cents};
use clipfund_common::{PayoutError, PayoutResult, SubmissionStatus, TransactionStatus};

use crate::allocator::{allocate, is_payable, Allocation};
use crate::traits::{NewTransaction, PaymentProcessor, PayoutContext, PayoutStore};

/// Retries for the conditional budget debit when racing payouts on the same
/// campaign invalidate the read.
const BUDGET_CAS_ATTEMPTS: u32 = 3;

/// Returned to the payout caller on success.
#[derive(Debug, Clone)]
pub struct PayoutReceipt {
    pub transaction_id: Uuid,
    pub client_secret: Option<String>,
    pub creator_payment: f64,
    pub total_cost: f64,
}

/// A `move_money` failure, carrying how much had already been transferred
/// when it happened. Only the unspent remainder of the debit may be
/// credited back; transferred money is spent budget.
struct MoveMoneyFailure {
    error: PayoutError,
    transferred: f64,
}

impl MoveMoneyFailure {
    fn at(transferred: f64) -> impl FnOnce(PayoutError) -> MoveMoneyFailure {
        move |error| MoveMoneyFailure { error, transferred }
    }
}

pub struct TransferOrchestrator {
    store: Arc<dyn PayoutStore>,
    processor: Arc<dyn PaymentProcessor>,
}

impl TransferOrchestrator {
    pub fn new(store: Arc<dyn PayoutStore>, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { store, processor }
    }

    /// Run the full allocate → debit → intent → transfers → ledger sequence
    /// for one approved submission.
    pub async fn process_payout(&self, submission_id: Uuid) -> PayoutResult<PayoutReceipt> {
        let ctx = self
            .store
            .load_payout_context(submission_id)
            .await?
            .ok_or_else(|| PayoutError::NotFound(format!("submission {submission_id}")))?;

        // Brand must have a verified processor setup before anything else.
        if !ctx.brand.payment_verified {
            return Err(PayoutError::PaymentSetup(
                "brand payment method not verified".into(),
            ));
        }
        let customer_id = ctx.brand.stripe_customer_id.clone().ok_or_else(|| {
            PayoutError::PaymentSetup("brand has no payment processor customer".into())
        })?;

        // Approved is the only state a payout attempt can originate from.
        if ctx.submission.status != SubmissionStatus::Approved {
            return Err(PayoutError::Validation(format!(
                "submission is {}, payouts originate from approved only",
                ctx.submission.status
            )));
        }

        let referrer_eligible = ctx.referrer.as_ref().is_some_and(|r| r.payable());

        let (alloc, debited) = self.allocate_and_debit(&ctx, referrer_eligible).await?;

        match self
            .move_money(&ctx, &customer_id, &alloc, referrer_eligible)
            .await
        {
            Ok(receipt) => Ok(receipt),
            Err(failure) => {
                // Saga rollback: restore only what did NOT transfer. Money
                // that reached a destination is spent budget and must stay
                // debited, or the pool could later be overspent.
                let unspent = round2(debited - failure.transferred);
                if failure.transferred > 0.0 {
                    warn!(
                        submission_id = %ctx.submission.id,
                        transferred = failure.transferred,
                        unspent,
                        "Payout failed after money moved; crediting unspent share only"
                    );
                }
                if unspent > 0.0 {
                    if let Err(credit_err) =
                        self.store.credit_budget(ctx.campaign.id, unspent).await
                    {
                        warn!(
                            error = %credit_err,
                            campaign_id = %ctx.campaign.id,
                            amount = unspent,
                            "Compensating budget credit failed; manual correction required"
                        );
                    }
                }
                Err(failure.error)
            }
        }
    }

    /// Allocate against a fresh budget read and apply the conditional debit,
    /// retrying on CAS misses so concurrent payouts cannot overspend the
    /// pool. All gates run before any mutation.
    async fn allocate_and_debit(
        &self,
        ctx: &PayoutContext,
        referrer_eligible: bool,
    ) -> PayoutResult<(Allocation, f64)> {
        let mut remaining = ctx.campaign.effective_remaining_budget();

        for attempt in 0..BUDGET_CAS_ATTEMPTS {
            let alloc = allocate(
                ctx.submission.views,
                ctx.campaign.rpm,
                ctx.campaign.referral_bonus_rate,
                remaining,
                referrer_eligible,
            );

            if alloc.creator_payment <= 0.0 {
                return Err(PayoutError::InsufficientBudget);
            }
            if !ctx.creator.payable() {
                return Err(PayoutError::CreatorNotPayable(
                    "no active transfer destination".into(),
                ));
            }

            let aggregate = self.store.aggregate_earnings(ctx.creator.id).await?;
            if !is_payable(alloc.creator_payment, aggregate) {
                return Err(PayoutError::BelowMinimum {
                    creator_payment: alloc.creator_payment,
                    min_payment: clipfund_common::policy::MIN_SUBMISSION_PAYOUT,
                    aggregate,
                    min_aggregate: clipfund_common::policy::MIN_AGGREGATE_EARNINGS,
                });
            }

            let debit = alloc.budget_debit();
            if self.store.debit_budget(ctx.campaign.id, debit).await? {
                return Ok((alloc, debit));
            }

            // Someone else debited between our read and the update;
            // re-read and re-allocate against what is actually left.
            remaining = self.store.remaining_budget(ctx.campaign.id).await?;
            info!(
                campaign_id = %ctx.campaign.id,
                attempt = attempt + 1,
                remaining,
                "Budget debit contention, re-allocating"
            );
        }

        Err(PayoutError::Db(
            "campaign budget contention, payout not attempted".into(),
        ))
    }

    /// Intent + transfers + ledger + submission update. Runs only after the
    /// budget debit succeeded; the caller compensates on error using the
    /// transferred amount carried by the failure.
    async fn move_money(
        &self,
        ctx: &PayoutContext,
        customer_id: &str,
        alloc: &Allocation,
        referrer_eligible: bool,
    ) -> Result<PayoutReceipt, MoveMoneyFailure> {
        let mut transferred = 0.0;
        let submission_id = ctx.submission.id;
        let transfer_group = format!("submission_{submission_id}");

        let mut metadata = BTreeMap::new();
        metadata.insert("submission_id".into(), submission_id.to_string());
        metadata.insert("creator_id".into(), ctx.creator.id.to_string());
        metadata.insert(
            "creator_amount".into(),
            format!("{:.2}", alloc.creator_payment),
        );
        metadata.insert(
            "referrer_amount".into(),
            format!("{:.2}", alloc.referrer_payment),
        );
        metadata.insert("service_fee".into(), format!("{:.2}", alloc.service_fee));
        if let Some(referrer) = &ctx.referrer {
            metadata.insert("referrer_id".into(), referrer.id.to_string());
        }

        let intent = self
            .processor
            .create_payment_intent(
                customer_id,
                to_cents(alloc.total_cost),
                &transfer_group,
                &metadata,
                &format!("payout-{submission_id}"),
            )
            .await
            .map_err(MoveMoneyFailure::at(transferred))?;

        if alloc.creator_payment > 0.0 {
            // Gates guarantee an active destination here.
            let destination = ctx
                .creator
                .stripe_account_id
                .as_deref()
                .ok_or_else(|| {
                    PayoutError::CreatorNotPayable("no active transfer destination".into())
                })
                .map_err(MoveMoneyFailure::at(transferred))?;
            self.processor
                .create_transfer(
                    destination,
                    to_cents(alloc.creator_payment),
                    &transfer_group,
                    &metadata,
                    &format!("payout-{submission_id}-creator"),
                )
                .await
                .map_err(MoveMoneyFailure::at(transferred))?;
            transferred = round2(transferred + alloc.creator_payment);
        }

        let mut paid_referrer_id = None;
        if alloc.referrer_payment > 0.0 && referrer_eligible {
            if let Some(referrer) = &ctx.referrer {
                if let Some(destination) = referrer.stripe_account_id.as_deref() {
                    self.processor
                        .create_transfer(
                            destination,
                            to_cents(alloc.referrer_payment),
                            &transfer_group,
                            &metadata,
                            &format!("payout-{submission_id}-referrer"),
                        )
                        .await
                        .map_err(MoveMoneyFailure::at(transferred))?;
                    transferred = round2(transferred + alloc.referrer_payment);
                    paid_referrer_id = Some(referrer.id);
                }
            }
        }

        let transaction_id = self
            .store
            .insert_transaction(&NewTransaction {
                submission_id,
                brand_id: ctx.brand.id,
                amount: alloc.total_cost,
                service_fee: alloc.service_fee,
                referrer_amount: if paid_referrer_id.is_some() {
                    alloc.referrer_payment
                } else {
                    0.0
                },
                referrer_id: paid_referrer_id,
                stripe_payment_intent_id: intent.id.clone(),
            })
            .await
            .map_err(MoveMoneyFailure::at(transferred))?;

        self.store
            .mark_payment_pending(submission_id, alloc.total_cost, alloc.creator_payment)
            .await
            .map_err(MoveMoneyFailure::at(transferred))?;

        info!(
            submission_id = %submission_id,
            transaction_id = %transaction_id,
            total = alloc.total_cost,
            creator = alloc.creator_payment,
            referrer = alloc.referrer_payment,
            "Payout dispatched"
        );

        Ok(PayoutReceipt {
            transaction_id,
            client_secret: intent.client_secret,
            creator_payment: alloc.creator_payment,
            total_cost: alloc.total_cost,
        })
    }

    /// Confirmation callback: verify the intent settled, then mark the
    /// transaction completed, the submission fulfilled, and credit the
    /// referrer's cumulative earnings when one was paid.
    pub async fn confirm_payout(
        &self,
        submission_id: Uuid,
        payment_intent_id: &str,
    ) -> PayoutResult<()> {
        let tx = self
            .store
            .find_transaction_for_intent(payment_intent_id)
            .await?
            .ok_or_else(|| {
                PayoutError::NotFound(format!("transaction for intent {payment_intent_id}"))
            })?;

        if tx.submission_id != submission_id {
            return Err(PayoutError::Validation(
                "payment intent does not belong to this submission".into(),
            ));
        }
        if tx.status == TransactionStatus::Completed {
            info!(submission_id = %submission_id, "Payout already confirmed");
            return Ok(());
        }

        if !self
            .processor
            .payment_intent_succeeded(payment_intent_id)
            .await?
        {
            return Err(PayoutError::NotSettled(payment_intent_id.to_string()));
        }

        let referrer_credit = match (tx.referrer_id, tx.referrer_amount) {
            (Some(id), amount) if amount > 0.0 => Some((id, amount)),
            _ => None,
        };

        self.store
            .complete_payout(tx.id, submission_id, referrer_credit)
            .await?;

        info!(submission_id = %submission_id, transaction_id = %tx.id, "Payout confirmed");
        Ok(())
    }
}

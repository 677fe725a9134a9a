//! `PaymentProcessor` implementation backed by the Stripe client.

use async_trait::async_trait;
use std::collections::BTreeMap;

use clipfund_common::{PayoutError, PayoutResult};
use stripe_client::StripeClient;

use crate::traits::{PaymentIntentHandle, PaymentProcessor};

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_payment_intent(
        &self,
        customer_id: &str,
        amount_cents: i64,
        transfer_group: &str,
        metadata: &BTreeMap<String, String>,
        idempotency_key: &str,
    ) -> PayoutResult<PaymentIntentHandle> {
        let intent = StripeClient::create_payment_intent(
            self,
            customer_id,
            amount_cents,
            transfer_group,
            metadata,
            idempotency_key,
        )
        .await
        .map_err(|e| PayoutError::Processor(e.to_string()))?;

        Ok(PaymentIntentHandle {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    async fn create_transfer(
        &self,
        destination: &str,
        amount_cents: i64,
        transfer_group: &str,
        metadata: &BTreeMap<String, String>,
        idempotency_key: &str,
    ) -> PayoutResult<String> {
        let transfer = StripeClient::create_transfer(
            self,
            destination,
            amount_cents,
            transfer_group,
            metadata,
            idempotency_key,
        )
        .await
        .map_err(|e| PayoutError::Processor(e.to_string()))?;

        Ok(transfer.id)
    }

    async fn payment_intent_succeeded(&self, intent_id: &str) -> PayoutResult<bool> {
        let intent = self
            .retrieve_payment_intent(intent_id)
            .await
            .map_err(|e| PayoutError::Processor(e.to_string()))?;
        Ok(intent.succeeded())
    }
}

//! Minimal Stripe client covering the payout path: payment intents against
//! the brand's customer, connected-account transfers, and lookups.
//!
//! Amounts cross this boundary as integer cents only. Writes carry an
//! `Idempotency-Key` header so a retried call cannot double-charge.

pub mod error;
pub mod types;

pub use error::{Result, StripeError};
pub use types::{Customer, PaymentIntent, Transfer};

use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.stripe.com/v1";

pub struct StripeClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self::with_base_url(secret_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(secret_key: &str, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// Create a payment intent charging `amount_cents` to a customer.
    /// `transfer_group` ties the intent to its downstream transfers.
    pub async fn create_payment_intent(
        &self,
        customer_id: &str,
        amount_cents: i64,
        transfer_group: &str,
        metadata: &BTreeMap<String, String>,
        idempotency_key: &str,
    ) -> Result<PaymentIntent> {
        let mut params: Vec<(String, String)> = vec![
            ("amount".into(), amount_cents.to_string()),
            ("currency".into(), "usd".into()),
            ("customer".into(), customer_id.to_string()),
            ("transfer_group".into(), transfer_group.to_string()),
            ("automatic_payment_methods[enabled]".into(), "true".into()),
        ];
        for (k, v) in metadata {
            params.push((format!("metadata[{k}]"), v.clone()));
        }

        self.post("payment_intents", &params, Some(idempotency_key))
            .await
    }

    /// Create a transfer to a connected account, grouped with its intent.
    pub async fn create_transfer(
        &self,
        destination: &str,
        amount_cents: i64,
        transfer_group: &str,
        metadata: &BTreeMap<String, String>,
        idempotency_key: &str,
    ) -> Result<Transfer> {
        let mut params: Vec<(String, String)> = vec![
            ("amount".into(), amount_cents.to_string()),
            ("currency".into(), "usd".into()),
            ("destination".into(), destination.to_string()),
            ("transfer_group".into(), transfer_group.to_string()),
        ];
        for (k, v) in metadata {
            params.push((format!("metadata[{k}]"), v.clone()));
        }

        self.post("transfers", &params, Some(idempotency_key)).await
    }

    pub async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        self.get(&format!("payment_intents/{intent_id}")).await
    }

    pub async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer> {
        self.get(&format!("customers/{customer_id}")).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T> {
        let mut req = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(params);
        if let Some(key) = idempotency_key {
            req = req.header("Idempotency-Key", key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), path, "Stripe API error");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), path, "Stripe API error");
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_intent_succeeded() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_123",
            "client_secret": "pi_123_secret_abc",
            "status": "succeeded",
            "amount": 11256,
        }))
        .unwrap();
        assert!(intent.succeeded());
        assert_eq!(intent.amount, 11256);
    }

    #[test]
    fn unsettled_intent_is_not_succeeded() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_123",
            "client_secret": null,
            "status": "requires_payment_method",
            "amount": 500,
        }))
        .unwrap();
        assert!(!intent.succeeded());
    }
}

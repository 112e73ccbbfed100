//! Payments checkout client
//!
//! Creates a hosted checkout session for a lead purchase (Stripe-style form
//! POST with a bearer secret key). Only the hosted URL is consumed; webhooks
//! and refunds are out of scope.

use lexdir_common::config::PaymentsSettings;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const API_URL: &str = "https://api.stripe.com/v1/checkout/sessions";
const USER_AGENT: &str = "Lexdir/0.1.0 (+https://lexdir.example)";

/// Payments client errors
#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    id: String,
    url: String,
}

/// Hosted checkout session handle
#[derive(Debug, Clone)]
pub struct Checkout {
    pub session_id: String,
    pub url: String,
}

/// Payments provider client
pub struct PaymentsClient {
    http_client: reqwest::Client,
    settings: PaymentsSettings,
}

impl PaymentsClient {
    pub fn new(settings: PaymentsSettings) -> Result<Self, PaymentsError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentsError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
        })
    }

    /// Create a checkout session for one lead at the given price (EUR)
    pub async fn create_checkout(
        &self,
        description: &str,
        price_eur: f64,
    ) -> Result<Checkout, PaymentsError> {
        // Provider wants integer cents
        let amount_cents = (price_eur * 100.0).round() as i64;

        let params = [
            ("mode", "payment".to_string()),
            ("success_url", self.settings.success_url.clone()),
            ("cancel_url", self.settings.cancel_url.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "line_items[0][price_data][currency]",
                "eur".to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                description.to_string(),
            ),
        ];

        tracing::debug!(amount_cents, "Creating checkout session");

        let response = self
            .http_client
            .post(API_URL)
            .bearer_auth(&self.settings.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| PaymentsError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PaymentsError::ApiError(status.as_u16(), error_text));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| PaymentsError::ParseError(e.to_string()))?;

        tracing::info!(session_id = %session.id, "Created checkout session");
        Ok(Checkout {
            session_id: session.id,
            url: session.url,
        })
    }
}

//! Payment provider client for refunds.
//!
//! # API Reference
//!
//! - Endpoint: `POST {PAYMENTS_API_BASE}/v1/refunds`
//! - Authentication: `Authorization: Bearer <secret key>`
//! - Body: form-encoded `payment_intent`, `amount` (minor units), `currency`,
//!   `reason`, `metadata[order_id]`, `metadata[note]`
//! - Replays with the same `Idempotency-Key` return the original refund
//!   instead of refunding twice.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use dewdrop_core::{CurrencyCode, OrderId};

use crate::config::PaymentsConfig;

/// Timeout for a single provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors that can occur when talking to the payment provider.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed before a response arrived.
    #[error("payment provider unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider refused the refund and said why.
    #[error("{0}")]
    Declined(String),

    /// The provider answered with something we could not interpret.
    #[error("unexpected payment provider response ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },

    /// The amount cannot be expressed in minor units.
    #[error("invalid refund amount: {0}")]
    InvalidAmount(Decimal),

    /// Client construction failed.
    #[error("payment client configuration: {0}")]
    Config(String),
}

/// A refund to execute at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub order_id: OrderId,
    /// Charge or payment-intent id from the original payment.
    pub payment_reference: String,
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub reason: Option<String>,
    /// Unique per attempt; reused only to replay a refund that executed but
    /// was not recorded.
    pub idempotency_key: String,
}

/// The provider's record of an executed refund.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderRefund {
    pub id: String,
    pub status: String,
}

/// Executes refunds against the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Refund `request.amount` against the original payment.
    async fn refund(&self, request: &RefundRequest) -> Result<ProviderRefund, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// Convert a major-unit amount to integer minor units (cents).
///
/// # Errors
///
/// Returns `PaymentError::InvalidAmount` for non-positive amounts, amounts
/// with sub-cent precision, or amounts too large for `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    let minor = amount * Decimal::ONE_HUNDRED;
    if amount <= Decimal::ZERO || minor.fract() != Decimal::ZERO {
        return Err(PaymentError::InvalidAmount(amount));
    }
    minor.to_i64().ok_or(PaymentError::InvalidAmount(amount))
}

/// HTTP client for the payment provider's refund API.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    inner: Arc<HttpPaymentGatewayInner>,
}

struct HttpPaymentGatewayInner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentGateway {
    /// Create a new provider client.
    ///
    /// # Errors
    ///
    /// Returns error if the secret key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| PaymentError::Config(format!("invalid secret key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpPaymentGatewayInner {
                client,
                base_url: config.api_base.trim_end_matches('/').to_string(),
            }),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id, amount = %request.amount))]
    async fn refund(&self, request: &RefundRequest) -> Result<ProviderRefund, PaymentError> {
        let amount = to_minor_units(request.amount)?;
        let mut form = vec![
            ("payment_intent", request.payment_reference.clone()),
            ("amount", amount.to_string()),
            ("currency", request.currency.code().to_lowercase()),
            ("reason", "requested_by_customer".to_string()),
            ("metadata[order_id]", request.order_id.to_string()),
        ];
        if let Some(reason) = &request.reason {
            form.push(("metadata[note]", reason.clone()));
        }

        let url = format!("{}/v1/refunds", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return serde_json::from_str::<ProviderRefund>(&body).map_err(|_| {
                PaymentError::UnexpectedResponse {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        tracing::warn!(status = status.as_u16(), "Payment provider rejected refund");
        match serde_json::from_str::<ProviderErrorBody>(&body) {
            Ok(error) => Err(PaymentError::Declined(error.error.message)),
            Err(_) => Err(PaymentError::UnexpectedResponse {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(500, 0)).unwrap(), 50_000);
        assert_eq!(to_minor_units(Decimal::new(1999, 2)).unwrap(), 1999);
        assert_eq!(to_minor_units(Decimal::new(20_000, 2)).unwrap(), 20_000);
    }

    #[test]
    fn test_to_minor_units_rejects_bad_amounts() {
        assert!(to_minor_units(Decimal::ZERO).is_err());
        assert!(to_minor_units(Decimal::new(-5, 0)).is_err());
        assert!(to_minor_units(Decimal::new(1001, 3)).is_err());
    }

    #[test]
    fn test_provider_error_body_parses() {
        let body = r#"{"error":{"message":"Charge ch_1 has already been refunded."}}"#;
        let parsed: ProviderErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Charge ch_1 has already been refunded.");
    }
}

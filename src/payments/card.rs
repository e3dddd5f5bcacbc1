use std::time::Duration;

use reqwest::Client;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::Deserialize;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Hosted-checkout session returned by the card processor. The `url` is what
/// the storefront redirects the shopper to; everything after that happens on
/// the processor's pages and comes back to us via webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Client for the card processor's hosted-checkout API.
#[derive(Debug, Clone)]
pub struct CardGateway {
    client: Client,
    base_url: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

impl CardGateway {
    pub fn new(
        base_url: String,
        secret_key: String,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            secret_key,
            success_url,
            cancel_url,
        }
    }

    /// Creates a hosted-checkout session for a pending order. The local order
    /// id rides along in session metadata so the completion webhook can be
    /// tied back to the order it settles.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_checkout_session(
        &self,
        order_id: Uuid,
        amount: Decimal,
        currency: &str,
        description: &str,
    ) -> Result<CheckoutSession, ServiceError> {
        let unit_amount = to_minor_units(amount).ok_or_else(|| {
            ServiceError::InvalidInput(format!("amount not representable in minor units: {}", amount))
        })?;

        let params: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("metadata[order_id]", order_id.to_string()),
            (
                "line_items[0][price_data][currency]",
                currency.to_lowercase(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                description.to_string(),
            ),
            ("line_items[0][quantity]", "1".to_string()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Card processor request failed: {}", e);
                ServiceError::ExternalServiceError("card processor unreachable".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Card processor rejected session creation");
            return Err(ServiceError::ExternalServiceError(format!(
                "card processor returned {}",
                status
            )));
        }

        response.json::<CheckoutSession>().await.map_err(|e| {
            error!("Card processor returned malformed session: {}", e);
            ServiceError::ExternalServiceError("malformed card processor response".to_string())
        })
    }
}

/// Converts a major-unit decimal amount into integer minor units (cents).
/// Amounts with sub-cent precision are rejected rather than rounded.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    let minor = amount.checked_mul(Decimal::from(100))?;
    if minor.fract() != Decimal::ZERO {
        return None;
    }
    minor.to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn converts_whole_amounts_to_cents() {
        assert_eq!(to_minor_units(dec!(120.00)), Some(12000));
        assert_eq!(to_minor_units(dec!(0.99)), Some(99));
        assert_eq!(to_minor_units(dec!(0)), Some(0));
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert_eq!(to_minor_units(dec!(10.005)), None);
    }
}

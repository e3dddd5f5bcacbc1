use std::time::Duration;

use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

const TOKEN_FETCH_ATTEMPTS: u32 = 3;

/// Order created on the wallet provider's side, awaiting shopper approval.
#[derive(Debug, Clone)]
pub struct WalletOrder {
    pub id: String,
    pub status: String,
}

/// Result of a capture call. `reference_id` echoes back the local order id we
/// attached at creation; `capture_id` is the provider's settlement record.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub status: String,
    pub reference_id: Option<String>,
    pub capture_id: Option<String>,
}

impl CaptureOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == "COMPLETED"
    }
}

/// Client for the wallet provider's order/capture API.
#[derive(Debug, Clone)]
pub struct WalletGateway {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl WalletGateway {
    pub fn new(base_url: String, client_id: String, client_secret: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            client_id,
            client_secret,
        }
    }

    /// Fetches a short-lived OAuth token. Token fetch is idempotent, so
    /// transient failures are retried with backoff; order mutation calls
    /// below are never retried.
    async fn fetch_access_token(&self) -> Result<String, ServiceError> {
        let mut last_err = None;

        for attempt in 1..=TOKEN_FETCH_ATTEMPTS {
            let result = self
                .client
                .post(format!("{}/v1/oauth2/token", self.base_url))
                .basic_auth(&self.client_id, Some(&self.client_secret))
                .form(&[("grant_type", "client_credentials")])
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    let body: Value = response.json().await.map_err(|e| {
                        ServiceError::ExternalServiceError(format!(
                            "malformed wallet token response: {}",
                            e
                        ))
                    })?;
                    return body
                        .get("access_token")
                        .and_then(|v| v.as_str())
                        .map(|t| t.to_string())
                        .ok_or_else(|| {
                            ServiceError::ExternalServiceError(
                                "wallet token response missing access_token".to_string(),
                            )
                        });
                }
                Ok(response) => {
                    warn!(
                        attempt,
                        status = %response.status(),
                        "Wallet token fetch rejected"
                    );
                    last_err = Some(format!("wallet auth returned {}", response.status()));
                }
                Err(e) => {
                    warn!(attempt, "Wallet token fetch failed: {}", e);
                    last_err = Some(format!("wallet auth unreachable: {}", e));
                }
            }

            if attempt < TOKEN_FETCH_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
            }
        }

        Err(ServiceError::ExternalServiceError(
            last_err.unwrap_or_else(|| "wallet auth failed".to_string()),
        ))
    }

    /// Creates a provider-side order carrying the local order id as
    /// `reference_id` so capture responses can be correlated back.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_order(
        &self,
        order_id: Uuid,
        amount: Decimal,
        currency: &str,
    ) -> Result<WalletOrder, ServiceError> {
        let token = self.fetch_access_token().await?;

        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": order_id.to_string(),
                "amount": {
                    "currency_code": currency,
                    "value": amount.to_string(),
                }
            }]
        });

        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.base_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Wallet order creation failed: {}", e);
                ServiceError::ExternalServiceError("wallet provider unreachable".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "Wallet provider rejected order creation");
            return Err(ServiceError::ExternalServiceError(format!(
                "wallet provider returned {}",
                status
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("malformed wallet order response: {}", e))
        })?;

        let id = json
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                ServiceError::ExternalServiceError(
                    "wallet order response missing id".to_string(),
                )
            })?;
        let status = json
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("CREATED")
            .to_string();

        Ok(WalletOrder { id, status })
    }

    /// Captures an approved provider order. Called exactly once per approval;
    /// a timeout here is surfaced to the caller rather than retried, since a
    /// blind retry could double-settle.
    #[instrument(skip(self))]
    pub async fn capture_order(&self, provider_order_id: &str) -> Result<CaptureOutcome, ServiceError> {
        let token = self.fetch_access_token().await?;

        let response = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{}/capture",
                self.base_url, provider_order_id
            ))
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                error!("Wallet capture failed: {}", e);
                ServiceError::ExternalServiceError("wallet provider unreachable".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "Wallet provider rejected capture");
            return Err(ServiceError::ExternalServiceError(format!(
                "wallet provider returned {}",
                status
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("malformed wallet capture response: {}", e))
        })?;

        Ok(parse_capture_outcome(&json))
    }
}

/// Pulls the fields reconciliation needs out of a capture response.
pub fn parse_capture_outcome(json: &Value) -> CaptureOutcome {
    let status = json
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("UNKNOWN")
        .to_string();

    let unit = json
        .get("purchase_units")
        .and_then(|v| v.as_array())
        .and_then(|a| a.first());

    let reference_id = unit
        .and_then(|u| u.get("reference_id"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let capture_id = unit
        .and_then(|u| u.get("payments"))
        .and_then(|p| p.get("captures"))
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("id"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    CaptureOutcome {
        status,
        reference_id,
        capture_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_completed_capture() {
        let body = json!({
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "purchase_units": [{
                "reference_id": "2f9e8a1c-6f3d-4a2e-9d5b-7c1e0f4a8b3d",
                "payments": {
                    "captures": [{ "id": "3C679366HH908993F", "status": "COMPLETED" }]
                }
            }]
        });

        let outcome = parse_capture_outcome(&body);
        assert!(outcome.is_completed());
        assert_eq!(
            outcome.reference_id.as_deref(),
            Some("2f9e8a1c-6f3d-4a2e-9d5b-7c1e0f4a8b3d")
        );
        assert_eq!(outcome.capture_id.as_deref(), Some("3C679366HH908993F"));
    }

    #[test]
    fn declined_capture_is_not_completed() {
        let body = json!({ "status": "DECLINED", "purchase_units": [] });

        let outcome = parse_capture_outcome(&body);
        assert!(!outcome.is_completed());
        assert_eq!(outcome.reference_id, None);
        assert_eq!(outcome.capture_id, None);
    }
}

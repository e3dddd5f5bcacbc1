use crate::{config::AppConfig, entities::order, errors::ServiceError};
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Outbound customer notifications over SMTP. When SMTP is not configured
/// the service runs disabled and every send becomes a logged no-op, so
/// development and test environments need no mail server.
#[derive(Clone)]
pub struct EmailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Option<String>,
}

impl EmailService {
    pub fn from_config(config: &Arc<AppConfig>) -> Result<Self, ServiceError> {
        if !config.email_enabled() {
            info!("SMTP not configured; email notifications disabled");
            return Ok(Self {
                transport: None,
                from: None,
            });
        }

        let host = config.smtp_host.as_deref().unwrap_or_default();
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| ServiceError::EmailError(format!("invalid SMTP relay: {}", e)))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: Some(builder.build()),
            from: config.email_from.clone(),
        })
    }

    pub fn disabled() -> Self {
        Self {
            transport: None,
            from: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Emails the customer that their order has a new tracking number.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn send_tracking_update(
        &self,
        to: &str,
        order: &order::Model,
        tracking_number: &str,
    ) -> Result<(), ServiceError> {
        let (Some(transport), Some(from)) = (&self.transport, &self.from) else {
            info!("Email disabled; skipping tracking notification");
            return Ok(());
        };

        let subject = format!("Your order {} is on its way", short_order_ref(order));
        let body = format!(
            "Good news!\n\n\
             Your order {} has shipped.\n\
             Tracking number: {}\n\n\
             Total: {} {}\n",
            short_order_ref(order),
            tracking_number,
            order.total_amount,
            order.currency,
        );

        let message = Message::builder()
            .from(from
                .parse()
                .map_err(|e| ServiceError::EmailError(format!("invalid sender address: {}", e)))?)
            .to(to
                .parse()
                .map_err(|e| ServiceError::EmailError(format!("invalid recipient address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| ServiceError::EmailError(format!("failed to build message: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| ServiceError::EmailError(format!("SMTP send failed: {}", e)))?;

        info!("Sent tracking notification");
        Ok(())
    }
}

/// Short human-readable order reference for email subjects.
fn short_order_ref(order: &order::Model) -> String {
    let id = order.id.simple().to_string();
    format!("#{}", &id[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::order::OrderStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn sample_order() -> order::Model {
        order::Model {
            id: Uuid::parse_str("2f9e8a1c-6f3d-4a2e-9d5b-7c1e0f4a8b3d").unwrap(),
            user_id: Uuid::new_v4(),
            product_id: None,
            total_amount: dec!(120.00),
            currency: "USD".to_string(),
            status: OrderStatus::Shipped,
            tracking_number: Some("TRK-1".to_string()),
            payment_reference: None,
            shipping_address: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn order_ref_is_short_and_stable() {
        assert_eq!(short_order_ref(&sample_order()), "#2F9E8A1C");
    }

    #[tokio::test]
    async fn disabled_service_sends_nothing_and_succeeds() {
        let service = EmailService::disabled();
        assert!(!service.is_enabled());
        service
            .send_tracking_update("a@b.com", &sample_order(), "TRK-1")
            .await
            .expect("disabled send is a no-op");
    }
}

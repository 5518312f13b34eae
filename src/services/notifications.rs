use crate::clients::MessageGateway;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, instrument};

/// Best-effort outbound customer messaging. Failures are logged and dropped;
/// a confirmed payment must never fail over a notification problem.
#[derive(Clone)]
pub struct NotificationService {
    messenger: Arc<dyn MessageGateway>,
}

impl NotificationService {
    pub fn new(messenger: Arc<dyn MessageGateway>) -> Self {
        Self { messenger }
    }

    #[instrument(skip(self))]
    pub async fn send_order_confirmation(
        &self,
        mobile: &str,
        reference_id: &str,
        amount: Decimal,
    ) {
        let message = format!(
            "Thank you for your order! Order ID: {}, Amount: \u{20b9}{}. Your order has been confirmed.",
            reference_id, amount
        );

        if let Err(err) = self.messenger.send_text(mobile, &message).await {
            error!("WhatsApp notification failed: {}", err);
        }
    }
}

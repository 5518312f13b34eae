pub mod health;
pub mod payments;

use crate::clients::{MessageGateway, PaymentGateway, ShippingCarrier};
use crate::config::AppConfig;
use crate::services::notifications::NotificationService;
use crate::services::payments::PaymentIntentService;
use crate::services::shipping::ShippingOrderService;
use crate::services::verification::PaymentVerificationService;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by HTTP handlers. Constructed once at startup with
/// explicit dependencies; clients are injected so tests can substitute
/// fakes without network access.
#[derive(Clone)]
pub struct AppServices {
    pub payments: Arc<PaymentIntentService>,
    pub verification: Arc<PaymentVerificationService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        carrier: Arc<dyn ShippingCarrier>,
        messenger: Arc<dyn MessageGateway>,
    ) -> Self {
        let shipping = ShippingOrderService::new(carrier, config.shopmozo_warehouse_id.clone());
        let notifications = NotificationService::new(messenger);

        let payments = Arc::new(PaymentIntentService::new(
            db.clone(),
            gateway.clone(),
            config.token_secret.clone(),
            Duration::from_secs(config.token_ttl_minutes * 60),
        ));

        let verification = Arc::new(PaymentVerificationService::new(
            db,
            gateway,
            shipping,
            notifications,
            config.razorpay_key_secret.clone(),
        ));

        Self {
            payments,
            verification,
        }
    }
}

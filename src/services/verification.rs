use crate::clients::PaymentGateway;
use crate::entities::pending_payment;
use crate::errors::ServiceError;
use crate::models::cart;
use crate::services::notifications::NotificationService;
use crate::services::shipping::ShippingOrderService;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

type HmacSha256 = Hmac<Sha256>;

/// Provider identifiers echoed back by the checkout client after payment.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CallbackEcho {
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
    #[serde(default)]
    pub razorpay_payment_id: Option<String>,
    #[serde(default)]
    pub razorpay_signature: Option<String>,
}

/// Correlation notes attached at intent time and echoed back unchanged.
/// A missing local id is a client/provider integration bug, not a security
/// failure; the signature check alone guards the mutation path.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CallbackNotes {
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_mobile_num: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(rename = "rzpResponse", default)]
    pub rzp_response: CallbackEcho,
    #[serde(default)]
    pub notes: CallbackNotes,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationOutcome {
    pub success: bool,
    pub message: String,
    pub payment_status: String,
    pub shopmozo_order_id: Option<String>,
}

/// Hex HMAC-SHA256 over `"{order_id}|{payment_id}"` with the provider
/// secret, the provider's callback signature scheme.
pub fn expected_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
) -> Result<String, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::InternalError("invalid signature key".to_string()))?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// Validates callback authenticity, reconciles provider payment state with
/// the stored pending payment and triggers at-most-once side effects.
#[derive(Clone)]
pub struct PaymentVerificationService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    shipping: ShippingOrderService,
    notifications: NotificationService,
    callback_secret: String,
}

impl PaymentVerificationService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        shipping: ShippingOrderService,
        notifications: NotificationService,
        callback_secret: impl Into<String>,
    ) -> Self {
        Self {
            db,
            gateway,
            shipping,
            notifications,
            callback_secret: callback_secret.into(),
        }
    }

    /// Step order is fixed: signature check, authoritative status fetch,
    /// shipping (conditional), row update, notification (conditional).
    /// The signature check is the sole authentication boundary and runs
    /// before any database write.
    #[instrument(skip(self, request))]
    pub async fn verify(
        &self,
        request: VerifyPaymentRequest,
    ) -> Result<VerificationOutcome, ServiceError> {
        let CallbackEcho {
            razorpay_order_id,
            razorpay_payment_id,
            razorpay_signature,
        } = request.rzp_response;

        let (order_id, payment_id, signature) =
            match (razorpay_order_id, razorpay_payment_id, razorpay_signature) {
                (Some(o), Some(p), Some(s)) if !o.is_empty() && !p.is_empty() && !s.is_empty() => {
                    (o, p, s)
                }
                _ => {
                    return Err(ServiceError::ValidationError(
                        "Missing Razorpay params".to_string(),
                    ))
                }
            };

        info!("Verifying payment: {}", payment_id);

        let expected = expected_signature(&self.callback_secret, &order_id, &payment_id)?;
        if !constant_time_eq(&expected, &signature) {
            warn!(
                "Payment callback signature mismatch for {}, possible tampering",
                payment_id
            );
            return Err(ServiceError::InvalidSignature);
        }

        let local_id: i64 = request
            .notes
            .user_id
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| {
                ServiceError::BadRequest("Missing order reference in notes".to_string())
            })?;

        // Never trust a client-supplied status; ask the provider directly.
        let payment = self.gateway.fetch_payment(&payment_id).await?;
        let is_paid = payment.status == "captured";

        let mut shipping_order_id: Option<String> = None;

        if is_paid {
            let row = pending_payment::Entity::find_by_id(local_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Pending payment {} not found", local_id))
                })?;

            if row.is_paid && row.provider_payment_id.as_deref() == Some(payment_id.as_str()) {
                // Replayed callback for an already-verified payment: reuse
                // the stored shipping id, no second shipment or message.
                info!("Payment {} already verified, skipping side effects", payment_id);
                shipping_order_id = row.shipping_order_id.clone();
            } else {
                let cart_items = cart::from_snapshot(&row.cart_snapshot);
                let id = self
                    .shipping
                    .create_shipping_order(&row, &cart_items, Utc::now().date_naive())
                    .await;
                shipping_order_id = Some(id);
            }
        }

        // Terminal write, applied for paid and unpaid outcomes alike. The
        // shipping reference is nulled when the payment did not capture.
        let snapshot = serde_json::to_string(&payment)?;
        let update = pending_payment::ActiveModel {
            id: Set(local_id),
            status: Set(payment.status.clone()),
            payment_snapshot: Set(Some(snapshot)),
            is_paid: Set(is_paid),
            provider_payment_id: Set(Some(payment_id.clone())),
            shipping_order_id: Set(shipping_order_id.clone()),
            ..Default::default()
        };
        update.update(&*self.db).await.map_err(|err| match err {
            DbErr::RecordNotUpdated => {
                ServiceError::NotFound(format!("Pending payment {} not found", local_id))
            }
            other => ServiceError::DatabaseError(other),
        })?;

        if is_paid {
            if let Some(mobile) = request
                .notes
                .user_mobile_num
                .as_deref()
                .filter(|m| !m.is_empty())
            {
                let reference = shipping_order_id.clone().unwrap_or_default();
                self.notifications
                    .send_order_confirmation(
                        mobile,
                        &reference,
                        Decimal::from(payment.amount) / Decimal::from(100),
                    )
                    .await;
            }
        }

        info!("Payment verification: {}", payment.status);

        Ok(VerificationOutcome {
            success: is_paid,
            message: if is_paid {
                "Payment successful".to_string()
            } else {
                "Payment authorized".to_string()
            },
            payment_status: payment.status,
            shopmozo_order_id: shipping_order_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::razorpay::{MockPaymentGateway, RazorpayPayment};
    use crate::clients::shopmozo::MockShippingCarrier;
    use crate::clients::whatsapp::MockMessageGateway;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    const SECRET: &str = "rzp_test_secret";

    async fn test_db() -> Arc<DatabaseConnection> {
        // Single connection: each pooled sqlite::memory: connection would
        // otherwise see its own empty database.
        let config = crate::db::DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = crate::db::establish_connection_with_config(&config)
            .await
            .expect("in-memory sqlite");
        crate::db::run_migrations(&db).await.expect("migrations");
        Arc::new(db)
    }

    async fn seed_pending_row(db: &DatabaseConnection) -> pending_payment::Model {
        let cart = vec![crate::models::cart::CartItem {
            product_id: 1,
            product_name: "Ghee".to_string(),
            quantity: 2,
            price: dec!(250),
            weight: None,
            sku: None,
            hsn: None,
            category: None,
            discount: None,
        }];

        pending_payment::ActiveModel {
            customer_name: Set("A".to_string()),
            mobile: Set("9876543210".to_string()),
            email: Set("a@x.com".to_string()),
            house_number: Set("12".to_string()),
            landmark: Set("Near temple".to_string()),
            pincode: Set("302001".to_string()),
            city: Set("Jaipur".to_string()),
            state: Set("Rajasthan".to_string()),
            country: Set("India".to_string()),
            total_amount: Set(dec!(500)),
            purchase_price: Set(dec!(400)),
            product_quantity: Set(2),
            order_date: Set(chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            order_time: Set(chrono::NaiveTime::from_hms_opt(10, 30, 0).unwrap()),
            shipping_order_id: Set(Some("TEMP_1a2b3c4d5e6f".to_string())),
            status: Set("pending".to_string()),
            is_paid: Set(false),
            provider_payment_id: Set(None),
            payment_snapshot: Set(None),
            cart_snapshot: Set(crate::models::cart::to_snapshot(&cart).unwrap()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("seed pending payment")
    }

    fn provider_payment(status: &str) -> RazorpayPayment {
        RazorpayPayment {
            id: "pay_123".to_string(),
            order_id: Some("order_ABC123".to_string()),
            status: status.to_string(),
            amount: 50000,
            captured: status == "captured",
            extra: serde_json::Map::new(),
        }
    }

    fn signed_request(local_id: i64, with_mobile: bool) -> VerifyPaymentRequest {
        VerifyPaymentRequest {
            rzp_response: CallbackEcho {
                razorpay_order_id: Some("order_ABC123".to_string()),
                razorpay_payment_id: Some("pay_123".to_string()),
                razorpay_signature: Some(
                    expected_signature(SECRET, "order_ABC123", "pay_123").unwrap(),
                ),
            },
            notes: CallbackNotes {
                user_id: Some(local_id.to_string()),
                user_name: Some("A".to_string()),
                user_email: Some("a@x.com".to_string()),
                user_mobile_num: with_mobile.then(|| "9876543210".to_string()),
            },
        }
    }

    fn service(
        db: Arc<DatabaseConnection>,
        gateway: MockPaymentGateway,
        carrier: MockShippingCarrier,
        messenger: MockMessageGateway,
    ) -> PaymentVerificationService {
        PaymentVerificationService::new(
            db,
            Arc::new(gateway),
            ShippingOrderService::new(Arc::new(carrier), "43190"),
            NotificationService::new(Arc::new(messenger)),
            SECRET,
        )
    }

    #[test]
    fn signature_helpers() {
        let sig = expected_signature(SECRET, "order_A", "pay_B").unwrap();
        // 32-byte digest, hex encoded
        assert_eq!(sig.len(), 64);
        assert_eq!(
            sig,
            expected_signature(SECRET, "order_A", "pay_B").unwrap()
        );
        assert_ne!(
            sig,
            expected_signature(SECRET, "order_A", "pay_C").unwrap()
        );

        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }

    #[tokio::test]
    async fn missing_provider_params_fail_fast() {
        let db = test_db().await;
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_fetch_payment().times(0);
        let mut carrier = MockShippingCarrier::new();
        carrier.expect_push_order().times(0);
        let messenger = MockMessageGateway::new();

        let mut request = signed_request(1, true);
        request.rzp_response.razorpay_signature = None;

        let err = service(db, gateway, carrier, messenger)
            .verify(request)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("Missing Razorpay params"));
    }

    #[tokio::test]
    async fn bad_signature_stops_before_any_mutation() {
        let db = test_db().await;
        let row = seed_pending_row(&db).await;

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_fetch_payment().times(0);
        let mut carrier = MockShippingCarrier::new();
        carrier.expect_push_order().times(0);
        let messenger = MockMessageGateway::new();

        let mut request = signed_request(row.id, true);
        request.rzp_response.razorpay_signature = Some("deadbeef".repeat(8));

        let err = service(db.clone(), gateway, carrier, messenger)
            .verify(request)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidSignature);

        // The row is untouched
        let unchanged = pending_payment::Entity::find_by_id(row.id)
            .one(&*db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged, row);
    }

    #[tokio::test]
    async fn captured_payment_ships_updates_and_notifies_once() {
        let db = test_db().await;
        let row = seed_pending_row(&db).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .times(1)
            .returning(|_| Ok(provider_payment("captured")));
        let mut carrier = MockShippingCarrier::new();
        carrier
            .expect_push_order()
            .times(1)
            .returning(|_| Ok("SMZ-99871".to_string()));
        let mut messenger = MockMessageGateway::new();
        messenger
            .expect_send_text()
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = service(db.clone(), gateway, carrier, messenger)
            .verify(signed_request(row.id, true))
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.payment_status, "captured");
        assert_eq!(outcome.shopmozo_order_id.as_deref(), Some("SMZ-99871"));

        let updated = pending_payment::Entity::find_by_id(row.id)
            .one(&*db)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.is_paid);
        assert_eq!(updated.status, "captured");
        assert_eq!(updated.provider_payment_id.as_deref(), Some("pay_123"));
        assert_eq!(updated.shipping_order_id.as_deref(), Some("SMZ-99871"));
        assert!(updated
            .payment_snapshot
            .as_deref()
            .unwrap_or_default()
            .contains("captured"));
    }

    #[tokio::test]
    async fn authorized_payment_updates_row_without_shipping() {
        let db = test_db().await;
        let row = seed_pending_row(&db).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .times(1)
            .returning(|_| Ok(provider_payment("authorized")));
        let mut carrier = MockShippingCarrier::new();
        carrier.expect_push_order().times(0);
        let mut messenger = MockMessageGateway::new();
        messenger.expect_send_text().times(0);

        let outcome = service(db.clone(), gateway, carrier, messenger)
            .verify(signed_request(row.id, true))
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.payment_status, "authorized");
        assert!(outcome.shopmozo_order_id.is_none());

        let updated = pending_payment::Entity::find_by_id(row.id)
            .one(&*db)
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.is_paid);
        assert_eq!(updated.status, "authorized");
        // Placeholder receipt is cleared on a non-paid terminal write
        assert!(updated.shipping_order_id.is_none());
    }

    #[tokio::test]
    async fn replayed_callback_runs_side_effects_at_most_once() {
        let db = test_db().await;
        let row = seed_pending_row(&db).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .times(2)
            .returning(|_| Ok(provider_payment("captured")));
        let mut carrier = MockShippingCarrier::new();
        carrier
            .expect_push_order()
            .times(1)
            .returning(|_| Ok("SMZ-99871".to_string()));
        let mut messenger = MockMessageGateway::new();
        messenger
            .expect_send_text()
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = service(db.clone(), gateway, carrier, messenger);

        let first = svc.verify(signed_request(row.id, true)).await.unwrap();
        let second = svc.verify(signed_request(row.id, true)).await.unwrap();

        assert!(first.success && second.success);
        // The replay reports the same shipping reference
        assert_eq!(first.shopmozo_order_id, second.shopmozo_order_id);

        let updated = pending_payment::Entity::find_by_id(row.id)
            .one(&*db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.shipping_order_id.as_deref(), Some("SMZ-99871"));
        assert_eq!(updated.provider_payment_id.as_deref(), Some("pay_123"));
    }

    #[tokio::test]
    async fn captured_without_mobile_skips_notification() {
        let db = test_db().await;
        let row = seed_pending_row(&db).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .times(1)
            .returning(|_| Ok(provider_payment("captured")));
        let mut carrier = MockShippingCarrier::new();
        carrier
            .expect_push_order()
            .times(1)
            .returning(|_| Ok("SMZ-99871".to_string()));
        let mut messenger = MockMessageGateway::new();
        messenger.expect_send_text().times(0);

        let outcome = service(db, gateway, carrier, messenger)
            .verify(signed_request(row.id, false))
            .await
            .unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn provider_fetch_failure_leaves_row_untouched() {
        let db = test_db().await;
        let row = seed_pending_row(&db).await;

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_fetch_payment().times(1).returning(|_| {
            Err(ServiceError::ExternalServiceError(
                "provider unreachable".to_string(),
            ))
        });
        let mut carrier = MockShippingCarrier::new();
        carrier.expect_push_order().times(0);
        let messenger = MockMessageGateway::new();

        let err = service(db.clone(), gateway, carrier, messenger)
            .verify(signed_request(row.id, true))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ExternalServiceError(_));

        let unchanged = pending_payment::Entity::find_by_id(row.id)
            .one(&*db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged, row);
    }

    #[tokio::test]
    async fn unknown_local_row_is_an_integration_bug_not_a_crash() {
        let db = test_db().await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_fetch_payment()
            .times(1)
            .returning(|_| Ok(provider_payment("captured")));
        let mut carrier = MockShippingCarrier::new();
        carrier.expect_push_order().times(0);
        let messenger = MockMessageGateway::new();

        let err = service(db, gateway, carrier, messenger)
            .verify(signed_request(424242, true))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }

    #[tokio::test]
    async fn missing_notes_reference_is_a_bad_request() {
        let db = test_db().await;

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_fetch_payment().times(0);
        let carrier = MockShippingCarrier::new();
        let messenger = MockMessageGateway::new();

        let mut request = signed_request(1, true);
        request.notes.user_id = None;

        let err = service(db, gateway, carrier, messenger)
            .verify(request)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::BadRequest(_));
    }
}

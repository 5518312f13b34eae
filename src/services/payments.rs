use crate::clients::{CreateOrderRequest, PaymentGateway};
use crate::entities::pending_payment;
use crate::errors::ServiceError;
use crate::models::cart::{self, CartItem};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static MOBILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10}$").unwrap());

/// Order total ceiling in currency major units
const MAX_ORDER_AMOUNT: i64 = 100_000;

/// Checkout input. Field names follow the storefront wire contract; every
/// required field is checked before any persistence or provider call.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "user_name is required"))]
    pub user_name: String,

    #[serde(default)]
    #[validate(regex(path = "MOBILE_RE", message = "Invalid mobile number format"))]
    pub user_mobile_num: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "user_email is required"))]
    pub user_email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "user_state is required"))]
    pub user_state: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "user_city is required"))]
    pub user_city: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "user_country is required"))]
    pub user_country: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "user_house_number is required"))]
    pub user_house_number: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "user_landmark is required"))]
    pub user_landmark: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "user_pincode is required"))]
    pub user_pincode: String,

    /// Order total in currency major units (rupees)
    #[serde(default)]
    #[validate(custom = "validate_order_amount")]
    pub user_total_amount: Decimal,

    #[serde(default)]
    #[validate(custom = "validate_required_amount")]
    pub purchase_price: Decimal,

    #[serde(default)]
    #[validate(range(min = 1, message = "product_quantity is required"))]
    pub product_quantity: i32,

    /// Line items, frozen verbatim into the pending-payment row
    #[serde(default)]
    pub cart: Vec<CartItem>,
}

fn validate_order_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO || *amount > Decimal::from(MAX_ORDER_AMOUNT) {
        let mut err = ValidationError::new("user_total_amount");
        err.message = Some("Invalid amount (must be between \u{20b9}1 - \u{20b9}100000)".into());
        return Err(err);
    }
    Ok(())
}

fn validate_required_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        let mut err = ValidationError::new("purchase_price");
        err.message = Some("purchase_price is required".into());
        return Err(err);
    }
    Ok(())
}

/// Successful initiation response handed back to the storefront client.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentInitiated {
    pub success: bool,
    pub message: String,
    pub razorpay_order_id: String,
    /// Full provider order object, opaque to this service
    pub razorpay_order: Value,
    /// Short-lived confirmation token; correlation data only, never proof
    /// of payment
    pub token: String,
    pub timestamp: String,
}

/// Read-only provider status report.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentStatusReport {
    pub success: bool,
    pub payment_status: String,
    /// Amount in currency major units
    pub amount: Decimal,
    pub order_id: String,
    pub captured: bool,
}

/// Claims bound into the checkout confirmation token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmationClaims {
    /// Pending-payment row id
    pub sub: String,
    /// Amount in minor units
    pub amount: i64,
    pub user_name: String,
    pub user_email: String,
    pub exp: usize,
}

/// Validates checkout input, persists the pending order and creates the
/// provider payment intent.
#[derive(Clone)]
pub struct PaymentIntentService {
    db: Arc<DatabaseConnection>,
    gateway: Arc<dyn PaymentGateway>,
    token_secret: String,
    token_ttl: Duration,
}

fn placeholder_receipt() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("TEMP_{}", &token[..12])
}

fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError("amount out of range".to_string()))
}

impl PaymentIntentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        gateway: Arc<dyn PaymentGateway>,
        token_secret: impl Into<String>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            db,
            gateway,
            token_secret: token_secret.into(),
            token_ttl,
        }
    }

    /// Creates a payment intent: pending row first, provider order second,
    /// confirmation token last. A provider failure after the insert leaves
    /// the row in "pending"; no funds have moved, so there is nothing to
    /// compensate.
    #[instrument(skip(self, request), fields(customer = %request.user_name))]
    pub async fn initiate(&self, request: CheckoutRequest) -> Result<PaymentInitiated, ServiceError> {
        request.validate()?;

        let amount_minor = to_minor_units(request.user_total_amount)?;

        info!(
            "Payment initiation for {}, amount \u{20b9}{}",
            request.user_name, request.user_total_amount
        );

        let receipt = placeholder_receipt();
        let now = Utc::now();

        let row = pending_payment::ActiveModel {
            customer_name: Set(request.user_name.clone()),
            mobile: Set(request.user_mobile_num.clone()),
            email: Set(request.user_email.clone()),
            house_number: Set(request.user_house_number.clone()),
            landmark: Set(request.user_landmark.clone()),
            pincode: Set(request.user_pincode.clone()),
            city: Set(request.user_city.clone()),
            state: Set(request.user_state.clone()),
            country: Set(request.user_country.clone()),
            total_amount: Set(request.user_total_amount),
            purchase_price: Set(request.purchase_price),
            product_quantity: Set(request.product_quantity),
            order_date: Set(now.date_naive()),
            order_time: Set(now.time()),
            shipping_order_id: Set(Some(receipt.clone())),
            status: Set("pending".to_string()),
            is_paid: Set(false),
            provider_payment_id: Set(None),
            payment_snapshot: Set(None),
            cart_snapshot: Set(cart::to_snapshot(&request.cart)?),
            ..Default::default()
        };
        let row = row.insert(&*self.db).await?;

        let order = self
            .gateway
            .create_order(CreateOrderRequest {
                amount: amount_minor,
                currency: "INR".to_string(),
                receipt,
                // Correlation data echoed back through the callback so
                // verification needs no extra round-trip.
                notes: json!({
                    "userId": row.id.to_string(),
                    "user_name": request.user_name.clone(),
                    "user_email": request.user_email.clone(),
                    "user_mobile_num": request.user_mobile_num.clone(),
                }),
            })
            .await?;

        let token = self.issue_confirmation_token(
            row.id,
            amount_minor,
            &request.user_name,
            &request.user_email,
        )?;

        Ok(PaymentInitiated {
            success: true,
            message: "Payment initiated successfully".to_string(),
            razorpay_order_id: order.id.clone(),
            razorpay_order: serde_json::to_value(&order)?,
            token,
            timestamp: Utc::now().format("%B %e, %Y %l:%M:%S %p").to_string(),
        })
    }

    /// Read-only status lookup against the provider.
    #[instrument(skip(self))]
    pub async fn check_status(&self, payment_id: &str) -> Result<PaymentStatusReport, ServiceError> {
        let payment = self
            .gateway
            .fetch_payment(payment_id)
            .await
            .map_err(|err| match err {
                ServiceError::NotFound(_) => err,
                other => {
                    warn!("Payment status check failed: {}", other);
                    ServiceError::NotFound("Payment not found".to_string())
                }
            })?;

        Ok(PaymentStatusReport {
            success: true,
            payment_status: payment.status.clone(),
            amount: Decimal::from(payment.amount) / Decimal::from(100),
            order_id: payment.order_id.unwrap_or_default(),
            captured: payment.captured,
        })
    }

    fn issue_confirmation_token(
        &self,
        row_id: i64,
        amount_minor: i64,
        user_name: &str,
        user_email: &str,
    ) -> Result<String, ServiceError> {
        let expiry = Utc::now() + chrono::Duration::from_std(self.token_ttl).unwrap_or_default();
        let claims = ConfirmationClaims {
            sub: row_id.to_string(),
            amount: amount_minor,
            user_name: user_name.to_string(),
            user_email: user_email.to_string(),
            exp: expiry.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.token_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token signing: {}", e)))
    }
}

use crate::config::AppConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Order-creation request sent to the provider. Amount is in currency minor
/// units (paise); the receipt carries our locally generated placeholder token
/// and the notes echo correlation data back through the payment callback.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    /// Remaining provider fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayPayment {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub status: String,
    pub amount: i64,
    #[serde(default)]
    pub captured: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Narrow interface over the payment provider so the checkout and
/// verification flows can be exercised against fakes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<RazorpayOrder, ServiceError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment, ServiceError>;
}

/// Razorpay REST client authenticated with the key id/secret pair.
#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client init: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.razorpay_api_url.trim_end_matches('/').to_string(),
            key_id: config.razorpay_key_id.clone(),
            key_secret: config.razorpay_key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    #[instrument(skip(self, request), fields(receipt = %request.receipt))]
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<RazorpayOrder, ServiceError> {
        let url = format!("{}/v1/orders", self.base_url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Razorpay: {}", e)))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Razorpay order creation rejected: {}", body);
            return Err(ServiceError::ExternalServiceError(
                "Razorpay rejected order creation".to_string(),
            ));
        }

        let order: RazorpayOrder = response
            .json()
            .await
            .map_err(|e| ServiceError::SerializationError(format!("Razorpay order: {}", e)))?;

        info!("Payment order created: {}", order.id);
        Ok(order)
    }

    #[instrument(skip(self))]
    async fn fetch_payment(&self, payment_id: &str) -> Result<RazorpayPayment, ServiceError> {
        let url = format!("{}/v1/payments/{}", self.base_url, payment_id);

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Razorpay: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound("Payment not found".to_string()));
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Razorpay payment fetch failed: {}", body);
            return Err(ServiceError::ExternalServiceError(
                "Razorpay payment fetch failed".to_string(),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::SerializationError(format!("Razorpay payment: {}", e)))
    }
}

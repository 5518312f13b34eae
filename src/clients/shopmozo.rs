use crate::config::AppConfig;
use crate::errors::ServiceError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Fulfillment order pushed to the Shopmozo shipping API. Field names match
/// the provider's wire format.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentOrderPayload {
    pub order_id: String,
    pub order_date: String,
    pub order_type: String,

    pub consignee_name: String,
    pub consignee_phone: i64,
    pub consignee_email: String,
    pub consignee_address_line_one: String,
    pub consignee_address_line_two: String,
    pub consignee_pin_code: i64,
    pub consignee_city: String,
    pub consignee_state: String,

    pub product_detail: Vec<ShipmentProduct>,

    pub payment_type: String,
    pub cod_amount: String,
    pub shipping_charges: String,
    pub weight: u32,
    pub length: u32,
    pub width: u32,
    pub height: u32,
    pub warehouse_id: String,
    pub gst_ewaybill_number: String,
    pub gstin_number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShipmentProduct {
    pub name: String,
    pub sku_number: String,
    pub quantity: i32,
    pub discount: String,
    pub hsn: String,
    pub unit_price: Decimal,
    pub product_category: String,
}

#[derive(Debug, Deserialize)]
struct PushOrderResponse {
    result: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<PushOrderData>,
}

#[derive(Debug, Deserialize)]
struct PushOrderData {
    order_id: String,
}

/// Narrow interface over the shipping provider. Callers decide fallback
/// behavior; the carrier only reports success or the provider's refusal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShippingCarrier: Send + Sync {
    async fn push_order(&self, payload: &ShipmentOrderPayload) -> Result<String, ServiceError>;
}

#[derive(Clone)]
pub struct ShopmozoClient {
    http: reqwest::Client,
    api_url: String,
    private_key: String,
    public_key: String,
}

impl ShopmozoClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.shipping_timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client init: {}", e)))?;

        Ok(Self {
            http,
            api_url: config.shopmozo_api_url.clone(),
            private_key: config.shopmozo_private_key.clone().unwrap_or_default(),
            public_key: config.shopmozo_public_key.clone().unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ShippingCarrier for ShopmozoClient {
    #[instrument(skip(self, payload), fields(order_id = %payload.order_id))]
    async fn push_order(&self, payload: &ShipmentOrderPayload) -> Result<String, ServiceError> {
        let response = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("private-key", &self.private_key)
            .header("public-key", &self.public_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Shopmozo: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Shopmozo returned {}: {}", status, body);
            return Err(ServiceError::ExternalServiceError(format!(
                "Shopmozo returned {}",
                status
            )));
        }

        let ack: PushOrderResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::SerializationError(format!("Shopmozo response: {}", e)))?;

        if ack.result == "1" {
            if let Some(data) = ack.data {
                info!("Shopmozo order created: {}", data.order_id);
                return Ok(data.order_id);
            }
        }

        Err(ServiceError::ExternalServiceError(format!(
            "Shopmozo rejected order: {}",
            ack.message.unwrap_or_else(|| "no message".to_string())
        )))
    }
}

use crate::clients::{ShipmentOrderPayload, ShipmentProduct, ShippingCarrier};
use crate::entities::pending_payment;
use crate::models::cart::CartItem;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ORDER_TYPE: &str = "ESSENTIALS";
const PAYMENT_TYPE: &str = "PREPAID";
const DEFAULT_HSN: &str = "17021190";
const DEFAULT_CATEGORY: &str = "General";

// Fixed parcel profile used for every shipment
const PARCEL_WEIGHT: u32 = 200;
const PARCEL_LENGTH: u32 = 10;
const PARCEL_WIDTH: u32 = 20;
const PARCEL_HEIGHT: u32 = 15;

/// Creates fulfillment orders with the external carrier. Shipping is
/// advisory: the caller always receives an order id, falling back to a
/// locally generated one when the carrier is skipped or fails.
#[derive(Clone)]
pub struct ShippingOrderService {
    carrier: Arc<dyn ShippingCarrier>,
    warehouse_id: String,
}

/// Locally generated shipping reference, also used as the order id sent to
/// the carrier so both sides share one identifier.
pub fn fallback_order_id() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("ORD_{}_{}", &token[..8], Utc::now().timestamp_millis())
}

impl ShippingOrderService {
    pub fn new(carrier: Arc<dyn ShippingCarrier>, warehouse_id: impl Into<String>) -> Self {
        Self {
            carrier,
            warehouse_id: warehouse_id.into(),
        }
    }

    #[instrument(skip(self, customer, cart), fields(customer = %customer.customer_name))]
    pub async fn create_shipping_order(
        &self,
        customer: &pending_payment::Model,
        cart: &[CartItem],
        order_date: NaiveDate,
    ) -> String {
        let local_id = fallback_order_id();

        if cart.is_empty() {
            info!("Cart is empty, skipping carrier handoff");
            return local_id;
        }

        let payload = self.build_payload(customer, cart, order_date, local_id.clone());

        match self.carrier.push_order(&payload).await {
            Ok(carrier_id) => carrier_id,
            Err(err) => {
                warn!(
                    "Carrier order creation failed, using local fallback id {}: {}",
                    local_id, err
                );
                local_id
            }
        }
    }

    fn build_payload(
        &self,
        customer: &pending_payment::Model,
        cart: &[CartItem],
        order_date: NaiveDate,
        order_id: String,
    ) -> ShipmentOrderPayload {
        ShipmentOrderPayload {
            order_id,
            order_date: order_date.format("%Y-%m-%d").to_string(),
            order_type: ORDER_TYPE.to_string(),
            consignee_name: customer.customer_name.clone(),
            consignee_phone: customer.mobile.parse().unwrap_or_default(),
            consignee_email: customer.email.clone(),
            consignee_address_line_one: customer.house_number.clone(),
            consignee_address_line_two: customer.landmark.clone(),
            consignee_pin_code: customer.pincode.parse().unwrap_or_default(),
            consignee_city: customer.city.clone(),
            consignee_state: customer.state.clone(),
            product_detail: cart
                .iter()
                .map(|item| ShipmentProduct {
                    name: item.product_name.clone(),
                    sku_number: item
                        .sku
                        .clone()
                        .unwrap_or_else(|| item.product_id.to_string()),
                    quantity: item.quantity,
                    discount: item.discount.clone().unwrap_or_default(),
                    hsn: item.hsn.clone().unwrap_or_else(|| DEFAULT_HSN.to_string()),
                    unit_price: item.price,
                    product_category: item
                        .category
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                })
                .collect(),
            payment_type: PAYMENT_TYPE.to_string(),
            cod_amount: String::new(),
            shipping_charges: String::new(),
            weight: PARCEL_WEIGHT,
            length: PARCEL_LENGTH,
            width: PARCEL_WIDTH,
            height: PARCEL_HEIGHT,
            warehouse_id: self.warehouse_id.clone(),
            gst_ewaybill_number: String::new(),
            gstin_number: String::new(),
        }
    }
}

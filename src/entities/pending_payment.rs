use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per checkout attempt, from intent creation through terminal
/// verification. Customer fields are a snapshot captured at order time;
/// the cart snapshot is the sole source of truth for line items at
/// verification, decoupled from later catalog edits.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub customer_name: String,
    pub mobile: String,
    pub email: String,
    pub house_number: String,
    pub landmark: String,
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub country: String,

    /// Total in currency major units (rupees)
    pub total_amount: Decimal,
    pub purchase_price: Decimal,
    pub product_quantity: i32,

    pub order_date: NaiveDate,
    pub order_time: NaiveTime,

    /// Placeholder receipt token until verification; carrier (or local
    /// fallback) id after a paid verification; NULL on a non-paid terminal
    /// write.
    pub shipping_order_id: Option<String>,

    /// "pending" until the provider reports a terminal status
    pub status: String,
    pub is_paid: bool,

    /// Set exactly once at verification, idempotent re-write tolerated
    pub provider_payment_id: Option<String>,

    /// Raw serialized provider payment object, kept for audit
    #[sea_orm(column_type = "Text", nullable)]
    pub payment_snapshot: Option<String>,

    /// Serialized cart line items, frozen at checkout time
    #[sea_orm(column_type = "Text")]
    pub cart_snapshot: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

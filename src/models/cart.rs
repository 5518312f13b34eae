use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

/// A single line item as submitted at checkout and frozen into the
/// pending-payment row. Optional fields default when the storefront client
/// does not send them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub product_id: i64,

    #[serde(alias = "name")]
    pub product_name: String,

    pub quantity: i32,

    /// Unit price in currency major units
    pub price: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
}

/// Serializes a cart for storage in the pending-payment row.
pub fn to_snapshot(cart: &[CartItem]) -> Result<String, serde_json::Error> {
    serde_json::to_string(cart)
}

/// Reconstructs a stored cart snapshot. An unreadable snapshot degrades to
/// an empty cart (which downstream shipping treats as "nothing to ship")
/// rather than blocking verification of a payment that already settled.
pub fn from_snapshot(raw: &str) -> Vec<CartItem> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(err) => {
            warn!("Unreadable cart snapshot, treating as empty: {}", err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_item() -> CartItem {
        CartItem {
            product_id: 1,
            product_name: "Ghee".to_string(),
            quantity: 2,
            price: dec!(250),
            weight: None,
            sku: Some("SKU001".to_string()),
            hsn: None,
            category: None,
            discount: None,
        }
    }

    #[test]
    fn snapshot_round_trip_preserves_items() {
        let cart = vec![sample_item()];
        let raw = to_snapshot(&cart).unwrap();
        assert_eq!(from_snapshot(&raw), cart);
    }

    #[test]
    fn empty_and_corrupt_snapshots_degrade_to_empty() {
        assert!(from_snapshot("").is_empty());
        assert!(from_snapshot("[]").is_empty());
        assert!(from_snapshot("{not json").is_empty());
    }

    #[test]
    fn accepts_name_alias_from_legacy_clients() {
        let item: CartItem =
            serde_json::from_str(r#"{"product_id":9,"name":"Honey","quantity":1,"price":"99.5"}"#)
                .unwrap();
        assert_eq!(item.product_name, "Honey");
        assert_eq!(item.price, dec!(99.5));
    }
}

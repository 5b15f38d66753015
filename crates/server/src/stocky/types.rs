//! Wire types for the Stocky purchase-order API.

use serde::Deserialize;

/// Response body for `GET /purchase_orders.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseOrderPage {
    /// Purchase orders on this page. Empty past the last page.
    #[serde(default)]
    pub purchase_orders: Vec<PurchaseOrder>,
}

/// A purchase order with its line items.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseOrder {
    /// Stocky purchase-order ID.
    pub id: i64,
    /// Line items on the order.
    #[serde(default)]
    pub purchase_items: Vec<PurchaseItem>,
}

/// A purchase-order line item.
///
/// Items without a SKU or a receipt date are skipped during sync; they
/// cannot contribute to per-SKU receipt bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseItem {
    /// SKU as entered in Stocky.
    pub sku: Option<String>,
    /// When the item was received, RFC 3339. Unset for unreceived items.
    pub received_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_page() {
        let body = r#"{
            "purchase_orders": [
                {
                    "id": 42,
                    "purchase_items": [
                        {"sku": "SKU-1", "received_at": "2026-08-01T12:00:00Z"},
                        {"sku": null, "received_at": "2026-08-02T12:00:00Z"},
                        {"sku": "SKU-2", "received_at": null}
                    ]
                }
            ]
        }"#;

        let page: PurchaseOrderPage = serde_json::from_str(body).expect("parse");
        assert_eq!(page.purchase_orders.len(), 1);
        assert_eq!(page.purchase_orders[0].purchase_items.len(), 3);
        assert_eq!(
            page.purchase_orders[0].purchase_items[0].sku.as_deref(),
            Some("SKU-1")
        );
    }

    #[test]
    fn test_deserialize_empty_page() {
        let page: PurchaseOrderPage = serde_json::from_str("{}").expect("parse");
        assert!(page.purchase_orders.is_empty());
    }
}

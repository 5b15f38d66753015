//! Final report assembly.
//!
//! Once the order scan finishes, the finished accumulator is joined against
//! the variant catalog and the cached purchase-order receipts. The threshold
//! splits variants into two sections: slow sellers are markdown candidates,
//! fast sellers are restock candidates.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockpilot_core::VariantId;

use crate::db::SkuReceipt;
use crate::shopify::VariantScan;

use super::accumulator::SalesAccumulator;

/// A finished report, stored on the job row and replayed on later polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    /// Lower bound of the scanned order window, RFC 3339.
    pub window_start: String,
    /// Look-back window the report was started with, in days.
    pub look_back_days: i64,
    /// Sold-quantity threshold separating the two sections.
    pub threshold_qty: i64,
    /// Orders scanned.
    pub processed_count: i64,
    /// True when the variant catalog hit the scan cap.
    pub truncated: bool,
    /// Variants that sold below the threshold (markdown candidates).
    pub markdown: Vec<ReportRow>,
    /// Variants that sold at or above the threshold (restock candidates).
    pub restock: Vec<ReportRow>,
}

/// One variant row in either report section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    /// Shopify variant GID.
    pub variant_id: VariantId,
    /// SKU, when the variant has one.
    pub sku: Option<String>,
    /// Variant display title.
    pub title: String,
    /// Parent product title.
    pub product_title: String,
    /// Current inventory across locations.
    pub inventory_quantity: i64,
    /// Units sold inside the window.
    pub sold_quantity: i64,
    /// Earliest sale inside the window, RFC 3339.
    pub first_sold_at: Option<String>,
    /// Latest sale inside the window, RFC 3339.
    pub last_sold_at: Option<String>,
    /// Earliest purchase-order receipt for this SKU.
    pub first_received_at: Option<DateTime<Utc>>,
    /// Latest purchase-order receipt for this SKU.
    pub last_received_at: Option<DateTime<Utc>>,
}

/// Join scan results into a report.
///
/// Every cataloged variant lands in exactly one section; variants with no
/// sales at all count as zero sold and fall on the markdown side.
#[must_use]
pub fn build_report(
    scan: &VariantScan,
    sales: &SalesAccumulator,
    receipts: &[SkuReceipt],
    window_start: DateTime<Utc>,
    look_back_days: i64,
    threshold_qty: i64,
    processed_count: i64,
) -> ReportPayload {
    let receipts_by_sku: HashMap<&str, &SkuReceipt> = receipts
        .iter()
        .map(|r| (r.sku.as_str(), r))
        .collect();

    let mut markdown = Vec::new();
    let mut restock = Vec::new();

    for variant in &scan.items {
        let variant_sales = sales.get(&variant.id);
        let sold_quantity = variant_sales.map_or(0, |s| s.quantity);
        let receipt = variant
            .sku
            .as_deref()
            .and_then(|sku| receipts_by_sku.get(sku));

        let row = ReportRow {
            variant_id: variant.id.clone(),
            sku: variant.sku.clone(),
            title: variant.title.clone(),
            product_title: variant.product_title.clone(),
            inventory_quantity: variant.inventory_quantity,
            sold_quantity,
            first_sold_at: variant_sales.map(|s| s.first_sold_at.clone()),
            last_sold_at: variant_sales.map(|s| s.last_sold_at.clone()),
            first_received_at: receipt.map(|r| r.first_received_at),
            last_received_at: receipt.map(|r| r.last_received_at),
        };

        if sold_quantity >= threshold_qty {
            restock.push(row);
        } else {
            markdown.push(row);
        }
    }

    // Markdown: slowest sellers first. Restock: fastest sellers first.
    markdown.sort_by(|a, b| {
        a.sold_quantity
            .cmp(&b.sold_quantity)
            .then_with(|| a.product_title.cmp(&b.product_title))
    });
    restock.sort_by(|a, b| {
        b.sold_quantity
            .cmp(&a.sold_quantity)
            .then_with(|| a.product_title.cmp(&b.product_title))
    });

    ReportPayload {
        window_start: window_start.to_rfc3339(),
        look_back_days,
        threshold_qty,
        processed_count,
        truncated: scan.truncated,
        markdown,
        restock,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::{OrderLineItem, OrderRecord, VariantRecord};
    use chrono::TimeZone;
    use stockpilot_core::{ShopDomain, Sku};

    fn variant(id: &str, sku: Option<&str>, product: &str, inventory: i64) -> VariantRecord {
        VariantRecord {
            id: VariantId::from(id),
            sku: sku.map(String::from),
            title: "Default".to_string(),
            product_title: product.to_string(),
            inventory_quantity: inventory,
        }
    }

    fn receipt(sku: &str, first: &str, last: &str) -> SkuReceipt {
        SkuReceipt {
            shop: ShopDomain::parse("test-store.myshopify.com").expect("shop"),
            sku: Sku::from(sku),
            first_received_at: first.parse().expect("first"),
            last_received_at: last.parse().expect("last"),
        }
    }

    fn sales_for(orders: &[OrderRecord]) -> SalesAccumulator {
        let mut acc = SalesAccumulator::default();
        acc.merge_orders(orders);
        acc
    }

    #[test]
    fn test_threshold_splits_sections() {
        let scan = VariantScan {
            items: vec![
                variant("v-slow", Some("SLOW-1"), "Slow Mover", 40),
                variant("v-fast", Some("FAST-1"), "Fast Mover", 3),
                variant("v-none", None, "Never Sold", 10),
            ],
            truncated: false,
        };
        let sales = sales_for(&[OrderRecord {
            id: "o1".to_string(),
            created_at: "2026-08-10T00:00:00Z".to_string(),
            line_items: vec![
                OrderLineItem {
                    variant_id: VariantId::from("v-fast"),
                    quantity: 7,
                },
                OrderLineItem {
                    variant_id: VariantId::from("v-slow"),
                    quantity: 1,
                },
            ],
        }]);

        let window_start = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let report = build_report(&scan, &sales, &[], window_start, 30, 5, 12);

        assert_eq!(report.restock.len(), 1);
        assert_eq!(report.restock[0].variant_id.as_str(), "v-fast");
        assert_eq!(report.restock[0].sold_quantity, 7);

        // Unsold variants are markdown candidates with zero sold.
        assert_eq!(report.markdown.len(), 2);
        assert_eq!(report.markdown[0].variant_id.as_str(), "v-none");
        assert_eq!(report.markdown[0].sold_quantity, 0);
        assert!(report.markdown[0].first_sold_at.is_none());
        assert_eq!(report.processed_count, 12);
    }

    #[test]
    fn test_exact_threshold_restocks() {
        let scan = VariantScan {
            items: vec![variant("v1", None, "Edge", 1)],
            truncated: false,
        };
        let sales = sales_for(&[OrderRecord {
            id: "o1".to_string(),
            created_at: "2026-08-10T00:00:00Z".to_string(),
            line_items: vec![OrderLineItem {
                variant_id: VariantId::from("v1"),
                quantity: 5,
            }],
        }]);

        let window_start = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let report = build_report(&scan, &sales, &[], window_start, 30, 5, 1);

        assert!(report.markdown.is_empty());
        assert_eq!(report.restock.len(), 1);
    }

    #[test]
    fn test_receipts_join_by_sku() {
        let scan = VariantScan {
            items: vec![
                variant("v1", Some("SKU-A"), "With Receipts", 2),
                variant("v2", Some("SKU-B"), "No Receipts", 2),
            ],
            truncated: true,
        };
        let receipts = vec![receipt(
            "SKU-A",
            "2026-01-05T00:00:00Z",
            "2026-07-20T00:00:00Z",
        )];

        let window_start = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let report = build_report(
            &scan,
            &SalesAccumulator::default(),
            &receipts,
            window_start,
            30,
            5,
            0,
        );

        assert!(report.truncated);
        let with = report
            .markdown
            .iter()
            .find(|r| r.variant_id.as_str() == "v1")
            .expect("v1");
        assert!(with.first_received_at.is_some());
        let without = report
            .markdown
            .iter()
            .find(|r| r.variant_id.as_str() == "v2")
            .expect("v2");
        assert!(without.first_received_at.is_none());
    }
}

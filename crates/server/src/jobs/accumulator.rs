//! Sales accumulator for the resumable order scan.
//!
//! The accumulator is the piece of job state that survives between polling
//! requests. Merging a page is a pure in-memory operation; persistence is
//! handled by the job row, which writes cursor and accumulator together only
//! after a page has been merged.
//!
//! Merging is NOT idempotent: replaying a page double-counts its quantities.
//! The cursor gate in the scan loop is what keeps each page merged exactly
//! once per successful advance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stockpilot_core::VariantId;

use crate::shopify::OrderRecord;

/// Running sales totals per variant, keyed by variant GID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesAccumulator {
    variants: BTreeMap<VariantId, VariantSales>,
}

/// Accumulated sales for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSales {
    /// Units sold across all merged orders.
    pub quantity: i64,
    /// Creation time of the earliest order seen, RFC 3339.
    pub first_sold_at: String,
    /// Creation time of the latest order seen, RFC 3339.
    pub last_sold_at: String,
}

impl SalesAccumulator {
    /// Merge one page of orders into the running totals.
    ///
    /// RFC 3339 timestamps in the same offset compare lexicographically, so
    /// the first/last bounds are plain string min/max.
    pub fn merge_orders(&mut self, orders: &[OrderRecord]) {
        for order in orders {
            for line in &order.line_items {
                match self.variants.get_mut(&line.variant_id) {
                    Some(sales) => {
                        sales.quantity += line.quantity;
                        if order.created_at < sales.first_sold_at {
                            sales.first_sold_at = order.created_at.clone();
                        }
                        if order.created_at > sales.last_sold_at {
                            sales.last_sold_at = order.created_at.clone();
                        }
                    }
                    None => {
                        self.variants.insert(
                            line.variant_id.clone(),
                            VariantSales {
                                quantity: line.quantity,
                                first_sold_at: order.created_at.clone(),
                                last_sold_at: order.created_at.clone(),
                            },
                        );
                    }
                }
            }
        }
    }

    /// Look up accumulated sales for a variant.
    #[must_use]
    pub fn get(&self, variant_id: &VariantId) -> Option<&VariantSales> {
        self.variants.get(variant_id)
    }

    /// Number of variants with at least one sale.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Whether no sales have been merged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shopify::OrderLineItem;

    fn order(id: &str, created_at: &str, lines: &[(&str, i64)]) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            created_at: created_at.to_string(),
            line_items: lines
                .iter()
                .map(|(variant_id, quantity)| OrderLineItem {
                    variant_id: VariantId::from(*variant_id),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn test_merge_sums_quantities_across_orders() {
        let mut acc = SalesAccumulator::default();
        acc.merge_orders(&[
            order("o1", "2026-08-01T10:00:00Z", &[("v1", 2), ("v2", 1)]),
            order("o2", "2026-08-02T10:00:00Z", &[("v1", 3)]),
        ]);

        assert_eq!(acc.get(&VariantId::from("v1")).map(|s| s.quantity), Some(5));
        assert_eq!(acc.get(&VariantId::from("v2")).map(|s| s.quantity), Some(1));
        assert_eq!(acc.len(), 2);
    }

    #[test]
    fn test_merge_tracks_sold_bounds() {
        let mut acc = SalesAccumulator::default();
        // Pages arrive newest-first, so later merges carry earlier orders.
        acc.merge_orders(&[order("o2", "2026-08-05T10:00:00Z", &[("v1", 1)])]);
        acc.merge_orders(&[order("o1", "2026-08-01T10:00:00Z", &[("v1", 1)])]);

        let sales = acc.get(&VariantId::from("v1")).expect("v1");
        assert_eq!(sales.first_sold_at, "2026-08-01T10:00:00Z");
        assert_eq!(sales.last_sold_at, "2026-08-05T10:00:00Z");
    }

    #[test]
    fn test_merge_is_not_idempotent() {
        // Replaying a page double-counts. This is load-bearing for the scan
        // loop's cursor gate; if merge ever becomes idempotent the gate's
        // at-least-once semantics need re-examination.
        let mut acc = SalesAccumulator::default();
        let page = [order("o1", "2026-08-01T10:00:00Z", &[("v1", 2)])];
        acc.merge_orders(&page);
        acc.merge_orders(&page);

        assert_eq!(acc.get(&VariantId::from("v1")).map(|s| s.quantity), Some(4));
    }

    #[test]
    fn test_serde_round_trip() {
        let mut acc = SalesAccumulator::default();
        acc.merge_orders(&[order("o1", "2026-08-01T10:00:00Z", &[("v1", 2)])]);

        let json = serde_json::to_string(&acc).expect("serialize");
        let restored: SalesAccumulator = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, acc);
    }

    #[test]
    fn test_empty_accumulator_serializes_as_object() {
        // The job row's accumulator column defaults to '{}'.
        let acc: SalesAccumulator = serde_json::from_str("{}").expect("deserialize");
        assert!(acc.is_empty());
    }
}

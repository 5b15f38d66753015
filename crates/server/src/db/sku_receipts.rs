//! Database operations for per-SKU purchase-order receipt bounds.
//!
//! Each row tracks the earliest and latest dates a SKU was received on any
//! purchase order. The upsert is idempotent and monotonic: re-merging a page
//! can only widen the bounds, never narrow them, so at-least-once page
//! delivery from the sync loop is safe.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use stockpilot_core::{ShopDomain, Sku};

use super::RepositoryError;

/// Receipt bounds for one SKU.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SkuReceipt {
    /// Shop this receipt belongs to.
    pub shop: ShopDomain,
    /// SKU as it appears on purchase-order line items.
    pub sku: Sku,
    /// Earliest receipt date observed.
    pub first_received_at: DateTime<Utc>,
    /// Latest receipt date observed.
    pub last_received_at: DateTime<Utc>,
}

/// Widen a SKU's receipt bounds with a newly observed receipt date.
///
/// Returns `true` if a row was inserted or changed. `first_received_at` only
/// ever decreases and `last_received_at` only ever increases; an observation
/// inside the existing bounds writes nothing.
///
/// # Errors
///
/// Returns error if the database upsert fails.
pub async fn observe_receipt(
    pool: &SqlitePool,
    shop: &ShopDomain,
    sku: &Sku,
    received_at: DateTime<Utc>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO sku_receipts (shop, sku, first_received_at, last_received_at)
        VALUES (?1, ?2, ?3, ?3)
        ON CONFLICT (shop, sku) DO UPDATE SET
            first_received_at = MIN(first_received_at, excluded.first_received_at),
            last_received_at = MAX(last_received_at, excluded.last_received_at)
        WHERE excluded.first_received_at < first_received_at
           OR excluded.last_received_at > last_received_at
        ",
    )
    .bind(shop)
    .bind(sku)
    .bind(received_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Fetch all receipt bounds for a shop, keyed by SKU.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn get_all(
    pool: &SqlitePool,
    shop: &ShopDomain,
) -> Result<Vec<SkuReceipt>, RepositoryError> {
    let receipts = sqlx::query_as::<_, SkuReceipt>(
        r"
        SELECT shop, sku, first_received_at, last_received_at
        FROM sku_receipts
        WHERE shop = ?1
        ORDER BY sku
        ",
    )
    .bind(shop)
    .fetch_all(pool)
    .await?;

    Ok(receipts)
}

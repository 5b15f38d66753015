//! Stocky purchase-order sync chunks.
//!
//! The full sync walks every purchase order ever placed, page by page, and
//! widens each SKU's receipt bounds. Progress is a count of fully merged
//! pages per shop: a page's receipts are merged first, then the count
//! advances, so an interruption re-merges at most one page. The receipt
//! upsert is monotonic, which makes that replay harmless.
//!
//! The quick sync re-reads only the first page, where Stocky surfaces the
//! most recently updated orders. It never touches the full-sync progress.

use std::time::Instant;

use sqlx::SqlitePool;
use stockpilot_core::{ShopDomain, Sku};
use tracing::instrument;

use crate::config::{SYNC_CHUNK_BUDGET, SYNC_PAGE_DELAY, SYNC_PAGE_SIZE};
use crate::db;
use crate::error::AppError;
use crate::stocky::{PurchaseOrderPage, StockyClient};

/// Outcome of one sync poll.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Pages merged by this chunk.
    pub pages_merged: u32,
    /// Pages fully merged so far across all chunks.
    pub page_offset: i64,
    /// Receipt rows inserted or widened by this chunk.
    pub receipts_updated: u64,
    /// Whether the purchase-order list has been exhausted.
    pub done: bool,
}

/// Run one chunk of a full sync.
///
/// With `restart` set the stored progress is discarded and the walk begins
/// at offset zero. Otherwise it resumes from the shop's stored progress; a
/// sync that previously ran to completion starts over from the beginning.
///
/// # Errors
///
/// Returns `AppError::Stocky` if a page fetch fails after retries, or
/// `AppError::Database` for storage failures.
#[instrument(skip(pool, stocky))]
pub async fn run_full_sync_chunk(
    pool: &SqlitePool,
    stocky: &StockyClient,
    shop: &ShopDomain,
    restart: bool,
) -> Result<SyncOutcome, AppError> {
    let mut page_offset = if restart {
        db::sync_state::reset(pool, shop).await?;
        0
    } else {
        match db::sync_state::get_state(pool, shop).await? {
            Some(ref s) if !s.full_done => s.page_offset,
            _ => {
                // Fresh sync, or re-running after a completed one.
                db::sync_state::reset(pool, shop).await?;
                0
            }
        }
    };

    let deadline = Instant::now() + SYNC_CHUNK_BUDGET;
    let mut pages_merged: u32 = 0;
    let mut receipts_updated: u64 = 0;
    let mut done = false;

    // At least one page per chunk so a tight budget still makes progress.
    while !done && (pages_merged == 0 || Instant::now() < deadline) {
        let offset = page_offset * i64::from(SYNC_PAGE_SIZE);
        let page = stocky.fetch_purchase_orders(offset, SYNC_PAGE_SIZE).await?;
        let count = page.purchase_orders.len();

        if count > 0 {
            receipts_updated += merge_page(pool, shop, &page).await?;
            page_offset += 1;
            pages_merged += 1;
        }
        // A short page is the end of the list.
        if count < SYNC_PAGE_SIZE as usize {
            done = true;
        }

        // Progress advances only after the whole page is merged.
        db::sync_state::advance(pool, shop, page_offset, done).await?;

        if !done && Instant::now() < deadline {
            tokio::time::sleep(SYNC_PAGE_DELAY).await;
        }
    }

    tracing::info!(
        shop = %shop,
        pages_merged,
        page_offset,
        receipts_updated,
        done,
        "Full sync chunk finished"
    );

    Ok(SyncOutcome {
        pages_merged,
        page_offset,
        receipts_updated,
        done,
    })
}

/// Re-merge the first purchase-order page.
///
/// # Errors
///
/// Returns `AppError::Stocky` if the page fetch fails after retries, or
/// `AppError::Database` for storage failures.
#[instrument(skip(pool, stocky))]
pub async fn run_quick_sync(
    pool: &SqlitePool,
    stocky: &StockyClient,
    shop: &ShopDomain,
) -> Result<SyncOutcome, AppError> {
    let page = stocky.fetch_purchase_orders(0, SYNC_PAGE_SIZE).await?;
    let receipts_updated = merge_page(pool, shop, &page).await?;

    let page_offset = db::sync_state::get_state(pool, shop)
        .await?
        .map_or(0, |s| s.page_offset);

    tracing::info!(shop = %shop, receipts_updated, "Quick sync finished");

    Ok(SyncOutcome {
        pages_merged: u32::from(!page.purchase_orders.is_empty()),
        page_offset,
        receipts_updated,
        done: true,
    })
}

/// Upsert every dated, SKU-bearing line item on a page.
async fn merge_page(
    pool: &SqlitePool,
    shop: &ShopDomain,
    page: &PurchaseOrderPage,
) -> Result<u64, AppError> {
    let mut updated: u64 = 0;

    for order in &page.purchase_orders {
        for item in &order.purchase_items {
            let (Some(sku), Some(received_at)) = (&item.sku, item.received_at) else {
                continue;
            };
            if sku.is_empty() {
                continue;
            }
            let sku = Sku::from(sku.as_str());
            if db::sku_receipts::observe_receipt(pool, shop, &sku, received_at).await? {
                updated += 1;
            }
        }
    }

    Ok(updated)
}

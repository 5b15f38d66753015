//! Database operations for Stocky full-sync progress.
//!
//! One row per shop. `page_offset` records how many purchase-order pages
//! have been fully merged, so a full sync interrupted at any point resumes
//! from the first unmerged page.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use stockpilot_core::ShopDomain;

use super::RepositoryError;

/// Full-sync progress for a shop.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncState {
    /// Shop this state belongs to.
    pub shop: ShopDomain,
    /// Number of purchase-order pages fully merged.
    pub page_offset: i64,
    /// Whether a full sync has run to completion at least once.
    pub full_done: bool,
    /// When the state was last advanced.
    pub updated_at: DateTime<Utc>,
}

/// Get the sync state for a shop, if any sync has ever run.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn get_state(
    pool: &SqlitePool,
    shop: &ShopDomain,
) -> Result<Option<SyncState>, RepositoryError> {
    let state = sqlx::query_as::<_, SyncState>(
        "SELECT shop, page_offset, full_done, updated_at FROM sync_state WHERE shop = ?1",
    )
    .bind(shop)
    .fetch_optional(pool)
    .await?;

    Ok(state)
}

/// Reset sync progress to the beginning of the purchase-order list.
///
/// Used when the client starts a fresh full sync.
///
/// # Errors
///
/// Returns error if the database upsert fails.
pub async fn reset(pool: &SqlitePool, shop: &ShopDomain) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO sync_state (shop, page_offset, full_done, updated_at)
        VALUES (?1, 0, 0, ?2)
        ON CONFLICT (shop) DO UPDATE SET
            page_offset = 0,
            full_done = 0,
            updated_at = excluded.updated_at
        ",
    )
    .bind(shop)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Record that pages up to `page_offset` have been fully merged.
///
/// Written only after every receipt on the page has been upserted, so the
/// offset never points past unmerged data.
///
/// # Errors
///
/// Returns error if the database upsert fails.
pub async fn advance(
    pool: &SqlitePool,
    shop: &ShopDomain,
    page_offset: i64,
    full_done: bool,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO sync_state (shop, page_offset, full_done, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (shop) DO UPDATE SET
            page_offset = excluded.page_offset,
            full_done = excluded.full_done,
            updated_at = excluded.updated_at
        ",
    )
    .bind(shop)
    .bind(page_offset)
    .bind(full_done)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

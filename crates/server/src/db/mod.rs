//! Database operations for report and sync state (`SQLite`).
//!
//! # Tables
//!
//! - `report_jobs` - Resumable order-scan jobs, one row per started report
//! - `sync_state` - Stocky full-sync progress, one row per shop
//! - `sku_receipts` - First/last purchase-order receipt dates per SKU
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p stockpilot-cli -- migrate
//! ```

pub mod report_jobs;
pub mod sku_receipts;
pub mod sync_state;

use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use thiserror::Error;

pub use report_jobs::ReportJob;
pub use sku_receipts::SkuReceipt;
pub use sync_state::SyncState;

/// Embedded migrations, shared with the CLI and the integration tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

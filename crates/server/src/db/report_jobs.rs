//! Database operations for resumable report jobs.
//!
//! A report job is driven by client polling: every `reportContinue` request
//! loads the row, scans order pages for a bounded slice of wall-clock time,
//! and writes cursor, accumulator, and counters back in a single update. The
//! row is therefore the only thing that has to survive between polls.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use stockpilot_core::{JobId, JobStatus, ShopDomain};

use super::RepositoryError;

/// A resumable report job row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportJob {
    /// Unique job ID, returned to the client on `reportStart`.
    pub id: JobId,
    /// Shop this job belongs to.
    pub shop: ShopDomain,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last advanced.
    pub updated_at: DateTime<Utc>,
    /// Lower bound of the order window being scanned.
    pub window_start: DateTime<Utc>,
    /// Shopify pagination cursor after the last merged page.
    pub cursor: Option<String>,
    /// Whether the scan has consumed every page in the window.
    pub done: bool,
    /// Orders processed so far.
    pub processed_count: i64,
    /// Serialized scan accumulator (JSON).
    pub accumulator: String,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Error message for sticky-errored jobs.
    pub error_message: Option<String>,
    /// Sold-quantity threshold splitting the two report sections.
    pub threshold_qty: i64,
    /// Look-back window the job was started with, in days.
    pub look_back_days: i64,
    /// Single-flight chunk lease expiry.
    pub lease_until: Option<DateTime<Utc>>,
    /// Serialized terminal report (JSON), set when the job finishes.
    pub result: Option<String>,
}

/// Create a new report job for a shop.
///
/// Jobs for the same shop older than `retention` are deleted first; the new
/// row becomes the shop's active job.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn create_job(
    pool: &SqlitePool,
    shop: &ShopDomain,
    window_start: DateTime<Utc>,
    threshold_qty: i64,
    look_back_days: i64,
    retention: std::time::Duration,
) -> Result<ReportJob, RepositoryError> {
    let now = Utc::now();
    let cutoff = now
        - Duration::from_std(retention)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

    sqlx::query("DELETE FROM report_jobs WHERE shop = ?1 AND created_at < ?2")
        .bind(shop)
        .bind(cutoff)
        .execute(pool)
        .await?;

    let id = JobId::generate();
    sqlx::query(
        r"
        INSERT INTO report_jobs (
            id, shop, created_at, updated_at, window_start,
            threshold_qty, look_back_days
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
    )
    .bind(&id)
    .bind(shop)
    .bind(now)
    .bind(now)
    .bind(window_start)
    .bind(threshold_qty)
    .bind(look_back_days)
    .execute(pool)
    .await?;

    get_job(pool, shop, &id)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// Get a job by ID, scoped to a shop.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn get_job(
    pool: &SqlitePool,
    shop: &ShopDomain,
    id: &JobId,
) -> Result<Option<ReportJob>, RepositoryError> {
    let job = sqlx::query_as::<_, ReportJob>(
        r"
        SELECT
            id, shop, created_at, updated_at, window_start,
            cursor, done, processed_count, accumulator, status,
            error_message, threshold_qty, look_back_days, lease_until, result
        FROM report_jobs
        WHERE shop = ?1 AND id = ?2
        ",
    )
    .bind(shop)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

/// Persist one merged page: cursor, accumulator, and counters together.
///
/// Written only after the page has been fetched and merged, so a crash
/// mid-chunk re-reads the last merged page at worst.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn advance(
    pool: &SqlitePool,
    id: &JobId,
    cursor: Option<&str>,
    done: bool,
    processed_count: i64,
    accumulator_json: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE report_jobs
        SET cursor = ?2, done = ?3, processed_count = ?4,
            accumulator = ?5, updated_at = ?6
        WHERE id = ?1
        ",
    )
    .bind(id)
    .bind(cursor)
    .bind(done)
    .bind(processed_count)
    .bind(accumulator_json)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a job done and store its terminal report.
///
/// Later polls for this job replay the stored result without touching any
/// upstream API.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn mark_done(
    pool: &SqlitePool,
    id: &JobId,
    result_json: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE report_jobs
        SET status = 'done', result = ?2, updated_at = ?3
        WHERE id = ?1
        ",
    )
    .bind(id)
    .bind(result_json)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a job as failed with a sticky error message.
///
/// The job stays in this state until the client starts a new report.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn mark_error(
    pool: &SqlitePool,
    id: &JobId,
    error_message: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE report_jobs
        SET status = 'error', error_message = ?2, updated_at = ?3
        WHERE id = ?1
        ",
    )
    .bind(id)
    .bind(error_message)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Try to acquire the single-flight chunk lease for a job.
///
/// Returns `true` if the lease was acquired. A held, unexpired lease means
/// another request is already scanning this job; the caller should answer
/// with a retryable busy signal instead of scanning concurrently.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn try_acquire_lease(
    pool: &SqlitePool,
    id: &JobId,
    ttl: std::time::Duration,
) -> Result<bool, RepositoryError> {
    let now = Utc::now();
    let lease_until = now
        + Duration::from_std(ttl).map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

    let result = sqlx::query(
        r"
        UPDATE report_jobs
        SET lease_until = ?2
        WHERE id = ?1 AND (lease_until IS NULL OR lease_until < ?3)
        ",
    )
    .bind(id)
    .bind(lease_until)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Release the chunk lease after a chunk completes.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn release_lease(pool: &SqlitePool, id: &JobId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE report_jobs SET lease_until = NULL WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

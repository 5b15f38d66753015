//! Resumable order-scan chunks.
//!
//! Every report request runs at most one chunk: a budgeted slice of order
//! pages fetched, merged, and persisted one page at a time. State machine
//! per poll:
//!
//! 1. Terminal job: replay the stored result or sticky error, no upstream
//!    calls.
//! 2. Lease held elsewhere: answer busy, the client retries.
//! 3. Otherwise: scan pages until the wall-clock budget runs out, then
//!    either hand back progress or, when the window is exhausted, assemble
//!    and store the final report.
//!
//! Cursor and accumulator are written together after each merged page, so a
//! crash loses at most the current page and a retry re-fetches it.

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use stockpilot_core::{JobId, JobStatus, ShopDomain};
use tracing::instrument;

use crate::config::{
    CHUNK_LEASE_TTL, JOB_RETENTION, ORDER_PAGE_SIZE, POLL_DELAY_MS, REPORT_CHUNK_BUDGET,
    SCAN_PAGE_DELAY, VARIANT_SCAN_CAP,
};
use crate::db::{self, ReportJob};
use crate::error::AppError;
use crate::shopify::{ShopifyClient, ShopifyError};

use super::accumulator::SalesAccumulator;
use super::report::{ReportPayload, build_report};

/// Outcome of one report poll.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Chunk ran; more polls needed.
    Progress {
        /// Job to poll again.
        job_id: JobId,
        /// Orders processed so far across all chunks.
        processed_count: i64,
        /// Pages merged by this chunk.
        pages_merged: u32,
        /// Suggested delay before the next poll, in milliseconds.
        poll_delay_ms: u64,
    },
    /// Another request holds the chunk lease; retry shortly.
    Busy {
        /// Job to poll again.
        job_id: JobId,
        /// Suggested delay before the retry, in milliseconds.
        retry_in_ms: u64,
    },
    /// The job finished; here is the report.
    Complete {
        /// Finished job.
        job_id: JobId,
        /// Assembled report.
        report: Box<ReportPayload>,
    },
    /// The job failed. A sticky failure repeats until a new report is
    /// started; a retryable one clears on the next successful poll.
    Failed {
        /// Failed job.
        job_id: JobId,
        /// Human-readable failure message for the envelope.
        message: String,
        /// Whether the job is still running and worth polling again.
        retryable: bool,
    },
}

/// Start a new report job and run its first chunk.
///
/// # Errors
///
/// Returns `AppError::Database` if job creation fails; chunk failures are
/// reported through `ScanOutcome::Failed`.
#[instrument(skip(pool, shopify))]
pub async fn start(
    pool: &SqlitePool,
    shopify: &ShopifyClient,
    shop: &ShopDomain,
    look_back_days: i64,
    threshold_qty: i64,
) -> Result<ScanOutcome, AppError> {
    let window_start = window_start_for(look_back_days, Utc::now());
    let job = db::report_jobs::create_job(
        pool,
        shop,
        window_start,
        threshold_qty,
        look_back_days,
        JOB_RETENTION,
    )
    .await?;

    tracing::info!(job_id = %job.id, look_back_days, threshold_qty, "Report job started");

    run_chunk(pool, shopify, shop, &job.id).await
}

/// Run one chunk of an existing job.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an unknown job ID and
/// `AppError::Database` for storage failures; upstream failures are
/// reported through `ScanOutcome::Failed`.
#[instrument(skip(pool, shopify))]
pub async fn run_chunk(
    pool: &SqlitePool,
    shopify: &ShopifyClient,
    shop: &ShopDomain,
    job_id: &JobId,
) -> Result<ScanOutcome, AppError> {
    let job = db::report_jobs::get_job(pool, shop, job_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown report job: {job_id}")))?;

    match job.status {
        JobStatus::Done => {
            // Replay the stored report without touching any upstream API.
            let raw = job.result.as_deref().ok_or_else(|| {
                AppError::Internal(format!("Done job {job_id} has no stored result"))
            })?;
            let report: ReportPayload = serde_json::from_str(raw)
                .map_err(|e| AppError::Internal(format!("Stored report unreadable: {e}")))?;
            return Ok(ScanOutcome::Complete {
                job_id: job.id,
                report: Box::new(report),
            });
        }
        JobStatus::Error => {
            let message = job
                .error_message
                .unwrap_or_else(|| "Report job failed".to_string());
            return Ok(ScanOutcome::Failed {
                job_id: job.id,
                message,
                retryable: false,
            });
        }
        JobStatus::Running => {}
    }

    if !db::report_jobs::try_acquire_lease(pool, job_id, CHUNK_LEASE_TTL).await? {
        tracing::debug!(job_id = %job_id, "Chunk lease held elsewhere");
        return Ok(ScanOutcome::Busy {
            job_id: job.id,
            retry_in_ms: POLL_DELAY_MS,
        });
    }

    let outcome = scan_chunk(pool, shopify, shop, job).await;
    db::report_jobs::release_lease(pool, job_id).await?;
    outcome
}

/// The budgeted scan itself; caller holds the chunk lease.
async fn scan_chunk(
    pool: &SqlitePool,
    shopify: &ShopifyClient,
    shop: &ShopDomain,
    job: ReportJob,
) -> Result<ScanOutcome, AppError> {
    let deadline = Instant::now() + REPORT_CHUNK_BUDGET;
    let window_start = job.window_start.to_rfc3339();

    let mut accumulator: SalesAccumulator = serde_json::from_str(&job.accumulator)
        .map_err(|e| AppError::Internal(format!("Stored accumulator unreadable: {e}")))?;
    let mut cursor = job.cursor.clone();
    let mut processed_count = job.processed_count;
    let mut done = job.done;
    let mut pages_merged: u32 = 0;

    // At least one page per chunk so a tight budget still makes progress.
    while !done && (pages_merged == 0 || Instant::now() < deadline) {
        let page = match shopify
            .fetch_orders_page(ORDER_PAGE_SIZE, cursor.as_deref(), &window_start)
            .await
        {
            Ok(page) => page,
            Err(err) => return Ok(handle_scan_error(pool, &job.id, err).await?),
        };

        processed_count += page.records.len() as i64;
        accumulator.merge_orders(&page.records);
        done = !page.has_more;
        if let Some(next) = page.next_cursor {
            cursor = Some(next);
        }

        // Cursor and accumulator advance together, after the merge.
        let accumulator_json = serde_json::to_string(&accumulator)
            .map_err(|e| AppError::Internal(format!("Accumulator serialization: {e}")))?;
        db::report_jobs::advance(
            pool,
            &job.id,
            cursor.as_deref(),
            done,
            processed_count,
            &accumulator_json,
        )
        .await?;
        pages_merged += 1;

        if !done && Instant::now() < deadline {
            tokio::time::sleep(SCAN_PAGE_DELAY).await;
        }
    }

    if !done {
        return Ok(ScanOutcome::Progress {
            job_id: job.id,
            processed_count,
            pages_merged,
            poll_delay_ms: POLL_DELAY_MS,
        });
    }

    // Window exhausted: join against the catalog and cached receipts.
    let scan = match shopify.fetch_all_variants(VARIANT_SCAN_CAP).await {
        Ok(scan) => scan,
        Err(err) => return Ok(handle_scan_error(pool, &job.id, err).await?),
    };
    let receipts = db::sku_receipts::get_all(pool, shop).await?;

    let report = build_report(
        &scan,
        &accumulator,
        &receipts,
        job.window_start,
        job.look_back_days,
        job.threshold_qty,
        processed_count,
    );

    let result_json = serde_json::to_string(&report)
        .map_err(|e| AppError::Internal(format!("Report serialization: {e}")))?;
    db::report_jobs::mark_done(pool, &job.id, &result_json).await?;

    tracing::info!(
        job_id = %job.id,
        processed_count,
        markdown = report.markdown.len(),
        restock = report.restock.len(),
        "Report job finished"
    );

    Ok(ScanOutcome::Complete {
        job_id: job.id,
        report: Box::new(report),
    })
}

/// Classify an upstream failure mid-chunk.
///
/// Transport hiccups and rate limiting leave the job running so the next
/// poll retries from the last persisted cursor. Anything else is sticky:
/// the job is marked errored and replays its message until a new report is
/// started.
async fn handle_scan_error(
    pool: &SqlitePool,
    job_id: &JobId,
    err: ShopifyError,
) -> Result<ScanOutcome, AppError> {
    let retryable = matches!(err, ShopifyError::Http(_) | ShopifyError::RateLimited(_));
    let message = err.to_string();

    if retryable {
        tracing::warn!(job_id = %job_id, error = %message, "Chunk failed, job still running");
    } else {
        tracing::error!(job_id = %job_id, error = %message, "Chunk failed, job errored");
        db::report_jobs::mark_error(pool, job_id, &message).await?;
    }

    Ok(ScanOutcome::Failed {
        job_id: job_id.clone(),
        message,
        retryable,
    })
}

/// Lower bound of the order window for a given look-back.
#[must_use]
pub fn window_start_for(look_back_days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(look_back_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_start_subtracts_days() {
        let now = Utc.with_ymd_and_hms(2026, 8, 31, 12, 0, 0).unwrap();
        let start = window_start_for(30, now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap());
    }
}

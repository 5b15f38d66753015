//! The report endpoint.
//!
//! A single `POST /reports` multiplexes every operation on an `intent`
//! field, matching how the embedded admin client drives it:
//!
//! - `reportStart` - create a report job and run its first chunk
//! - `reportContinue` - run one more chunk of an existing job
//! - `stockyFullSync` - run one chunk of the purchase-order full sync
//! - `stockyQuickSync` - re-merge the first purchase-order page
//!
//! Responses always echo the validated inputs. Invalid input is a 400 and
//! missing Stocky configuration is a 500; everything else, including caught
//! upstream failures, is a 200 so the polling client keeps control.

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::{Value, json};
use stockpilot_core::{JobId, JobStatus};
use tracing::instrument;

use crate::error::AppError;
use crate::jobs::{ReportPayload, ScanOutcome, SyncOutcome, full_sync, report_scan};
use crate::state::AppState;
use crate::stocky::StockyClient;

/// Bounds accepted for `lookBackDays`.
const LOOK_BACK_RANGE: std::ops::RangeInclusive<i64> = 1..=365;

/// Default `thresholdQty` when the client omits it.
const DEFAULT_THRESHOLD_QTY: i64 = 5;

/// Response envelope for every intent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    /// The validated inputs this response answers.
    pub inputs: Value,
    /// Report job state, for report intents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportBody>,
    /// Sync progress, for sync intents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_sync: Option<SyncOutcome>,
    /// Informational message (e.g., busy signal).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Caught failure, rendered inline by the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report job state in the envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    /// Job to echo back on the next `reportContinue`.
    pub job_id: JobId,
    /// Job lifecycle status.
    pub status: JobStatus,
    /// Orders processed so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_count: Option<i64>,
    /// Pages merged by this chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_merged: Option<u32>,
    /// Suggested delay before the next poll, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_delay_ms: Option<u64>,
    /// The finished report, once status is done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<ReportPayload>>,
}

/// Handle `POST /reports`.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for malformed input and
/// `AppError::Configuration` when a sync intent runs without a Stocky key.
#[instrument(skip(state, body))]
pub async fn handle(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ReportResponse>, AppError> {
    let intent = body
        .get("intent")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Missing intent".to_string()))?;

    match intent {
        "reportStart" => report_start(&state, &body).await,
        "reportContinue" => report_continue(&state, &body).await,
        "stockyFullSync" => {
            let mode = body
                .get("mode")
                .and_then(Value::as_str)
                .unwrap_or("continue");
            let restart = match mode {
                "start" => true,
                "continue" => false,
                other => {
                    return Err(AppError::BadRequest(format!(
                        "mode must be start or continue, got {other}"
                    )));
                }
            };
            let stocky = require_stocky(&state)?;
            let inputs = json!({ "intent": "stockyFullSync", "mode": mode });
            let result = full_sync::run_full_sync_chunk(
                state.pool(),
                stocky,
                &state.config().shopify.store,
                restart,
            )
            .await;
            Ok(Json(sync_response(inputs, result)))
        }
        "stockyQuickSync" => {
            let stocky = require_stocky(&state)?;
            let inputs = json!({ "intent": "stockyQuickSync" });
            let result =
                full_sync::run_quick_sync(state.pool(), stocky, &state.config().shopify.store)
                    .await;
            Ok(Json(sync_response(inputs, result)))
        }
        other => Err(AppError::BadRequest(format!("Unknown intent: {other}"))),
    }
}

async fn report_start(
    state: &AppState,
    body: &Value,
) -> Result<Json<ReportResponse>, AppError> {
    let look_back_days = optional_i64(body, "lookBackDays")?
        .unwrap_or(state.config().default_look_back_days);
    if !LOOK_BACK_RANGE.contains(&look_back_days) {
        return Err(AppError::BadRequest(format!(
            "lookBackDays must be between 1 and 365, got {look_back_days}"
        )));
    }

    let threshold_qty = optional_i64(body, "thresholdQty")?.unwrap_or(DEFAULT_THRESHOLD_QTY);
    if threshold_qty < 0 {
        return Err(AppError::BadRequest(format!(
            "thresholdQty must not be negative, got {threshold_qty}"
        )));
    }

    let inputs = json!({
        "intent": "reportStart",
        "lookBackDays": look_back_days,
        "thresholdQty": threshold_qty,
    });

    let result = report_scan::start(
        state.pool(),
        state.shopify(),
        &state.config().shopify.store,
        look_back_days,
        threshold_qty,
    )
    .await;

    Ok(Json(scan_response(inputs, result)?))
}

async fn report_continue(
    state: &AppState,
    body: &Value,
) -> Result<Json<ReportResponse>, AppError> {
    let job_id = body
        .get("jobId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing jobId".to_string()))?;
    let job_id = JobId::from(job_id);

    let inputs = json!({
        "intent": "reportContinue",
        "jobId": job_id,
    });

    let result = report_scan::run_chunk(
        state.pool(),
        state.shopify(),
        &state.config().shopify.store,
        &job_id,
    )
    .await;

    Ok(Json(scan_response(inputs, result)?))
}

/// Fold a scan result into the envelope, catching reportable failures.
fn scan_response(
    inputs: Value,
    result: Result<ScanOutcome, AppError>,
) -> Result<ReportResponse, AppError> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) if err.is_reportable() => {
            tracing::warn!(error = %err, "Report intent failed");
            return Ok(envelope(inputs, None, None, None, Some(err.to_string())));
        }
        Err(err) => return Err(err),
    };

    let response = match outcome {
        ScanOutcome::Progress {
            job_id,
            processed_count,
            pages_merged,
            poll_delay_ms,
        } => envelope(
            inputs,
            Some(ReportBody {
                job_id,
                status: JobStatus::Running,
                processed_count: Some(processed_count),
                pages_merged: Some(pages_merged),
                poll_delay_ms: Some(poll_delay_ms),
                result: None,
            }),
            None,
            None,
            None,
        ),
        ScanOutcome::Busy { job_id, retry_in_ms } => envelope(
            inputs,
            Some(ReportBody {
                job_id,
                status: JobStatus::Running,
                processed_count: None,
                pages_merged: None,
                poll_delay_ms: Some(retry_in_ms),
                result: None,
            }),
            None,
            Some("Another request is scanning this job; retry shortly".to_string()),
            None,
        ),
        ScanOutcome::Complete { job_id, report } => {
            let processed_count = report.processed_count;
            envelope(
                inputs,
                Some(ReportBody {
                    job_id,
                    status: JobStatus::Done,
                    processed_count: Some(processed_count),
                    pages_merged: None,
                    poll_delay_ms: None,
                    result: Some(report),
                }),
                None,
                None,
                None,
            )
        }
        // A retryable failure left the job running at its last cursor, so
        // the client sees a pollable job plus the message; only a sticky
        // failure renders as a terminal error.
        ScanOutcome::Failed {
            job_id,
            message,
            retryable: true,
        } => envelope(
            inputs,
            Some(ReportBody {
                job_id,
                status: JobStatus::Running,
                processed_count: None,
                pages_merged: None,
                poll_delay_ms: Some(crate::config::POLL_DELAY_MS),
                result: None,
            }),
            None,
            Some(message),
            None,
        ),
        ScanOutcome::Failed {
            job_id,
            message,
            retryable: false,
        } => envelope(
            inputs,
            Some(ReportBody {
                job_id,
                status: JobStatus::Error,
                processed_count: None,
                pages_merged: None,
                poll_delay_ms: None,
                result: None,
            }),
            None,
            None,
            Some(message),
        ),
    };

    Ok(response)
}

/// Fold a sync result into the envelope, catching reportable failures.
fn sync_response(inputs: Value, result: Result<SyncOutcome, AppError>) -> ReportResponse {
    match result {
        Ok(outcome) => envelope(inputs, None, Some(outcome), None, None),
        Err(err) => {
            tracing::warn!(error = %err, "Sync intent failed");
            envelope(inputs, None, None, None, Some(err.to_string()))
        }
    }
}

fn require_stocky(state: &AppState) -> Result<&StockyClient, AppError> {
    state.stocky().ok_or_else(|| {
        AppError::Configuration(
            "STOCKY_API_KEY and STOCKY_STORE_NAME are not configured".to_string(),
        )
    })
}

fn optional_i64(body: &Value, key: &str) -> Result<Option<i64>, AppError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("{key} must be an integer"))),
    }
}

fn envelope(
    inputs: Value,
    report: Option<ReportBody>,
    full_sync: Option<SyncOutcome>,
    message: Option<String>,
    error: Option<String>,
) -> ReportResponse {
    ReportResponse {
        inputs,
        report,
        full_sync,
        message,
        error,
    }
}

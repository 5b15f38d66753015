//! Report polling command.
//!
//! Drives a report job the same way the embedded admin client does: one
//! `reportStart`, then `reportContinue` until the server answers with a
//! terminal status. The finished report is printed as JSON on stdout.

use std::time::Duration;

use serde_json::{Value, json};

use super::sync::{CommandError, post_reports};

/// Polls after a chunk that did not carry a delay hint.
const FALLBACK_POLL_DELAY: Duration = Duration::from_secs(1);

/// Safety valve against a server that never reaches a terminal state.
const MAX_POLLS: u32 = 600;

/// Start a report and poll it to completion.
///
/// # Errors
///
/// Returns `CommandError` if a request fails, the server reports an error,
/// or the job never terminates.
pub async fn run(
    server_url: &str,
    look_back_days: Option<i64>,
    threshold_qty: Option<i64>,
) -> Result<(), CommandError> {
    let client = reqwest::Client::new();

    let mut request = json!({ "intent": "reportStart" });
    if let Some(days) = look_back_days {
        request["lookBackDays"] = json!(days);
    }
    if let Some(qty) = threshold_qty {
        request["thresholdQty"] = json!(qty);
    }

    let mut body = post_reports(&client, server_url, &request).await?;

    for _ in 0..MAX_POLLS {
        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(CommandError::Server(error.to_string()));
        }

        let report = body
            .get("report")
            .ok_or_else(|| CommandError::Server("Response carried no report".to_string()))?;

        match report.get("status").and_then(Value::as_str) {
            Some("done") => {
                let result = report.get("result").cloned().unwrap_or(Value::Null);
                #[allow(clippy::print_stdout)]
                {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                return Ok(());
            }
            Some("running") => {
                if let Some(processed) = report.get("processedCount").and_then(Value::as_i64) {
                    tracing::info!(processed, "Report in progress");
                }
            }
            other => {
                return Err(CommandError::Server(format!(
                    "Unexpected report status: {other:?}"
                )));
            }
        }

        let delay = report
            .get("pollDelayMs")
            .and_then(Value::as_u64)
            .map_or(FALLBACK_POLL_DELAY, Duration::from_millis);
        tokio::time::sleep(delay).await;

        let job_id = report
            .get("jobId")
            .and_then(Value::as_str)
            .ok_or_else(|| CommandError::Server("Response carried no jobId".to_string()))?;
        body = post_reports(
            &client,
            server_url,
            &json!({ "intent": "reportContinue", "jobId": job_id }),
        )
        .await?;
    }

    Err(CommandError::Server(format!(
        "Report did not finish within {MAX_POLLS} polls"
    )))
}

//! Stocky sync polling command.
//!
//! Full mode repeats `stockyFullSync` until the server reports the
//! purchase-order list exhausted. Quick mode sends one `stockyQuickSync`.

use std::time::Duration;

use serde_json::{Value, json};

/// Pause between full-sync chunks.
const CHUNK_DELAY: Duration = Duration::from_secs(1);

/// Safety valve against a sync that never finishes.
const MAX_POLLS: u32 = 600;

/// Errors shared by the polling commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// POST one intent to the server's report endpoint.
///
/// # Errors
///
/// Returns `CommandError::Server` with the response body for non-2xx
/// answers, or `CommandError::Http` for transport failures.
pub async fn post_reports(
    client: &reqwest::Client,
    server_url: &str,
    body: &Value,
) -> Result<Value, CommandError> {
    let url = format!("{}/reports", server_url.trim_end_matches('/'));
    let response = client.post(&url).json(body).send().await?;

    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(CommandError::Server(format!("{status}: {text}")));
    }

    Ok(serde_json::from_str(&text)?)
}

/// Run the purchase-order sync to completion.
///
/// # Errors
///
/// Returns `CommandError` if a request fails, the server reports an error,
/// or the sync never finishes.
pub async fn run(server_url: &str, quick: bool) -> Result<(), CommandError> {
    let client = reqwest::Client::new();
    let intent = if quick {
        "stockyQuickSync"
    } else {
        "stockyFullSync"
    };

    for poll in 0..MAX_POLLS {
        let request = if quick {
            json!({ "intent": intent })
        } else {
            // First poll starts the walk over; later polls continue it.
            let mode = if poll == 0 { "start" } else { "continue" };
            json!({ "intent": intent, "mode": mode })
        };
        let body = post_reports(&client, server_url, &request).await?;

        if let Some(error) = body.get("error").and_then(Value::as_str) {
            return Err(CommandError::Server(error.to_string()));
        }

        let sync = body
            .get("fullSync")
            .ok_or_else(|| CommandError::Server("Response carried no sync state".to_string()))?;

        let pages = sync.get("pageOffset").and_then(Value::as_i64).unwrap_or(0);
        let updated = sync
            .get("receiptsUpdated")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        tracing::info!(pages, updated, "Sync chunk finished");

        if sync.get("done").and_then(Value::as_bool) == Some(true) {
            tracing::info!("Sync complete");
            return Ok(());
        }

        tokio::time::sleep(CHUNK_DELAY).await;
    }

    Err(CommandError::Server(format!(
        "Sync did not finish within {MAX_POLLS} polls"
    )))
}

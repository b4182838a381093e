//! Webhook notification sinks.
//!
//! Each sink flavor implements [`Notifier`](crate::core::Notifier) and owns
//! its payload shape and success status. The delivery worker only sees the
//! trait, so adding a sink does not touch the delivery loop.

pub mod discord;
pub mod slack;

pub use discord::DiscordNotifier;
pub use slack::SlackNotifier;

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("{sink} returned status {status}, the response is: {body}")]
    Status {
        sink: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("HTTP request to {sink} failed: {source}")]
    Transport {
        sink: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Builds the HTTP client shared by every webhook sink.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// POSTs `payload` as JSON and requires exactly `expected` back.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    sink: &'static str,
    url: &str,
    payload: &Value,
    expected: StatusCode,
) -> Result<(), NotifyError> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|source| NotifyError::Transport { sink, source })?;

    let status = response.status();
    if status == expected {
        debug!(sink, %status, "Webhook accepted notification");
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    debug!(sink, %status, body = %body, "Webhook rejected notification");
    Err(NotifyError::Status { sink, status, body })
}

//! A client for sending notifications to Slack.

use super::{post_json, NotifyError};
use crate::core::{MatchLine, Notifier};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use tracing::instrument;

/// Posts `{"text": line}` to a Slack incoming webhook and expects `200 OK`.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(client: reqwest::Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    #[instrument(skip_all, fields(domain = line.domain()))]
    async fn notify(&self, line: &MatchLine) -> Result<(), NotifyError> {
        let payload = json!({ "text": line.to_string() });
        post_json(&self.client, "slack", &self.webhook_url, &payload, StatusCode::OK).await
    }
}

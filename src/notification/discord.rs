//! Discord incoming webhooks.

use super::{post_json, NotifyError};
use crate::core::{MatchLine, Notifier};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use tracing::instrument;

/// Posts `{"content": line}` and expects `204 No Content`.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(client: reqwest::Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    #[instrument(skip_all, fields(domain = line.domain()))]
    async fn notify(&self, line: &MatchLine) -> Result<(), NotifyError> {
        let payload = json!({ "content": line.to_string() });
        post_json(
            &self.client,
            "discord",
            &self.webhook_url,
            &payload,
            StatusCode::NO_CONTENT,
        )
        .await
    }
}

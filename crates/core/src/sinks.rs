//! Webhook sinks for alerts and fulfillment notifications.
//!
//! Both sinks log unconditionally and post to their configured webhook
//! only if one is set. Neither ever propagates its own failure: a flaky
//! webhook endpoint must never take down the fulfillment loop that's
//! trying to report through it.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

fn client() -> Client {
    Client::builder()
        .timeout(WEBHOOK_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Posts operational alerts (RPC errors, decode failures, dispatch
/// exhaustion) to a Discord-style webhook.
pub struct AlertSink {
    hook_url: Option<String>,
    client: Client,
}

impl AlertSink {
    pub fn new(hook_url: Option<String>) -> Self {
        Self {
            hook_url,
            client: client(),
        }
    }

    pub async fn send(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "sending alert hook");
        let Some(url) = &self.hook_url else {
            return;
        };
        let body = json!({ "content": message });
        if let Err(e) = self.client.post(url).json(&body).send().await {
            warn!(error = %e, "failed to send alert hook");
        }
    }
}

/// Posts successful fulfillment notifications (request id, tx hash, block).
pub struct FulfillmentSink {
    hook_url: Option<String>,
    client: Client,
}

impl FulfillmentSink {
    pub fn new(hook_url: Option<String>) -> Self {
        Self {
            hook_url,
            client: client(),
        }
    }

    pub async fn send(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(%message, "sending fulfillment hook");
        let Some(url) = &self.hook_url else {
            return;
        };
        let body = json!({ "content": message });
        if let Err(e) = self.client.post(url).json(&body).send().await {
            warn!(error = %e, "failed to send fulfillment hook");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_without_hook_url_is_a_noop() {
        let sink = AlertSink::new(None);
        // Must not panic or block; there's nowhere to send this.
        sink.send("test alert").await;
    }
}

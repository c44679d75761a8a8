//! Fire-and-forget order notifications to the messaging webhook.
//!
//! The caller never waits on delivery; the post is bounded by the
//! configured timeout and its outcome is only logged.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use shop_links::ActionLink;

/// JSON body posted to the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct NotifyPayload {
    pub order_id: Uuid,
    pub code: String,
    pub text: String,
    pub links: Vec<ActionLink>,
}

/// Plain-text message: a header line, then one "label: url" line per link.
pub fn compose_message(code: &str, status_label: &str, links: &[ActionLink]) -> String {
    let mut text = format!("Order {code}: {status_label}");
    if links.is_empty() {
        text.push_str("\nNo further actions.");
    }
    for link in links {
        text.push('\n');
        text.push_str(&link.label);
        text.push_str(": ");
        text.push_str(&link.url);
    }
    text
}

/// Post `payload` on a background task.
pub fn spawn_notify(
    http: reqwest::Client,
    webhook_url: String,
    timeout: Duration,
    payload: NotifyPayload,
) {
    tokio::spawn(async move {
        let order_id = payload.order_id;
        let res = http
            .post(&webhook_url)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match res {
            Ok(r) => info!(order_id = %order_id, status = %r.status(), "order notification sent"),
            Err(e) => warn!(
                order_id = %order_id,
                timed_out = e.is_timeout(),
                "order notification failed"
            ),
        }
    });
}

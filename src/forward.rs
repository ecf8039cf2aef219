use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{GatewayError, Result};

/// Downstream notification target for verified webhook events.
///
/// Forwarding is best-effort: the caller-facing acknowledgment is finalized
/// before the forward task runs, and a forwarding failure is only ever
/// observed on the dead-letter log target.
#[async_trait]
pub trait EventForwarder: Send + Sync {
    async fn forward(&self, event: Value) -> Result<()>;
}

pub type ForwarderArc = Arc<dyn EventForwarder>;

/// Log target carrying forward failures. Nothing else reads or reacts to it.
pub const DEAD_LETTER_TARGET: &str = "payrelay::forward";

/// Dispatches the forward as a detached task. `None` means no target is
/// configured and the forward is silently skipped.
pub fn spawn_forward(forwarder: Option<ForwarderArc>, event: Value) {
    let Some(forwarder) = forwarder else {
        tracing::warn!("no forward target configured; skipping");
        return;
    };
    let event_id = event
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    tokio::spawn(async move {
        match forwarder.forward(event).await {
            Ok(()) => tracing::info!(event_id, "forwarded event to target"),
            Err(e) => {
                tracing::error!(target: DEAD_LETTER_TARGET, event_id, error = %e, "forward failed");
            }
        }
    });
}

/// Posts `{"stripe_event": <event>}` to a fixed target URL.
pub struct HttpForwarder {
    client: reqwest::Client,
    target_url: String,
}

impl HttpForwarder {
    pub fn new(target_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GatewayError::provider("Forward target", e.to_string()))?;
        Ok(Self {
            client,
            target_url: target_url.into(),
        })
    }
}

#[async_trait]
impl EventForwarder for HttpForwarder {
    async fn forward(&self, event: Value) -> Result<()> {
        let response = self
            .client
            .post(&self.target_url)
            .json(&json!({ "stripe_event": event }))
            .send()
            .await
            .map_err(|e| GatewayError::provider("Forward target", e.to_string()))?;
        if !response.status().is_success() {
            return Err(GatewayError::provider(
                "Forward target",
                format!("status {}", response.status()),
            ));
        }
        Ok(())
    }
}

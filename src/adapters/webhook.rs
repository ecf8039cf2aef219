use serde_json::{Value, json};

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::event::CanonicalRequest;
use crate::forward::{ForwarderArc, spawn_forward};
use crate::signature;

/// Verifies a provider webhook and acknowledges it.
///
/// Verification runs over the raw, unparsed body; the acknowledgment is
/// built before the best-effort downstream forward is dispatched, so the
/// `200` contract to the provider never depends on downstream availability.
pub async fn handle(
    config: &Config,
    forwarder: Option<ForwarderArc>,
    request: &CanonicalRequest,
) -> Result<Value> {
    tracing::info!("webhook: start");
    let secret = config.stripe_webhook_secret()?;

    let body = request
        .raw_body
        .as_deref()
        .ok_or_else(|| GatewayError::Validation("Missing webhook body".to_string()))?;
    let header = request
        .signature
        .as_deref()
        .ok_or_else(|| GatewayError::Validation("Missing Stripe signature".to_string()))?;

    signature::verify(body, header, secret)?;

    // Only verified bodies are parsed into an event.
    let event: Value = serde_json::from_str(body)
        .map_err(|e| GatewayError::Validation(format!("Webhook body is not JSON: {e}")))?;

    let event_type = event.get("type").cloned().unwrap_or(Value::Null);
    let event_id = event.get("id").cloned().unwrap_or(Value::Null);
    let object = event
        .pointer("/data/object")
        .cloned()
        .unwrap_or_else(|| json!({}));
    tracing::info!(
        event_id = event_id.as_str().unwrap_or_default(),
        event_type = event_type.as_str().unwrap_or_default(),
        "webhook: verified event"
    );

    let ack = json!({
        "received": true,
        "event_type": event_type,
        "event_id": event_id,
        "object": object,
    });

    spawn_forward(forwarder, event);

    Ok(ack)
}

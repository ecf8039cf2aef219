use serde_json::{Map, Value, json};

use crate::config::Config;
use crate::error::Result;
use crate::event::str_field;
use crate::mailer::{Mailer, OutgoingEmail, build_mime};

/// Sends one transactional email.
///
/// Without an attachment the message goes through the provider's simple-send
/// primitive, the body routed to the HTML or plain slot by the `html` flag.
/// With an attachment a multipart MIME message is built and sent raw. The
/// sender comes from configuration; its absence is a configuration error,
/// not a per-call one.
pub async fn send(
    config: &Config,
    mailer: &dyn Mailer,
    payload: &Map<String, Value>,
) -> Result<Value> {
    tracing::info!("email: start");
    let sender = config.email_sender()?;

    // Contract-checked fields; `html` was defaulted by the contract.
    let to = str_field(payload, "to").unwrap_or_default();
    let subject = str_field(payload, "subject").unwrap_or_default();
    let body = str_field(payload, "body").unwrap_or_default();
    let html = match payload.get("html") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    };

    let email = OutgoingEmail {
        sender: sender.to_string(),
        to: to.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        html,
    };

    let attachment = payload.get("attachment").and_then(Value::as_object);
    let result = match attachment {
        Some(attachment) => {
            let filename = attachment
                .get("filename")
                .and_then(Value::as_str)
                .unwrap_or("attachment.bin");
            let content = attachment
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let mime = build_mime(&email, filename, content);
            mailer.send_raw(&email.sender, &email.to, &mime).await?
        }
        None => mailer.send_simple(&email).await?,
    };

    tracing::info!(to = email.to, "email: sent");
    Ok(json!({ "sent": true, "provider_response": result }))
}

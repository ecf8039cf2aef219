use serde::Serialize;
use serde_json::{Value, json};

use crate::error::GatewayError;

/// The terminal, caller-facing shape of every invocation. The body is always
/// a JSON-encoded mapping; on failure it carries `error` and, when the
/// underlying cause is known, `detail`.
#[derive(Debug, Serialize, PartialEq)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Headers,
    pub body: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Headers {
    #[serde(rename = "Content-Type")]
    pub content_type: &'static str,
}

impl ResponseEnvelope {
    pub fn new(status_code: u16, body: &Value) -> Self {
        Self {
            status_code,
            headers: Headers {
                content_type: "application/json",
            },
            body: body.to_string(),
        }
    }

    pub fn ok(body: &Value) -> Self {
        Self::new(200, body)
    }

    /// Decodes the body back into JSON. Test convenience; the body is
    /// produced from a `Value` so this cannot fail in practice.
    pub fn body_json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

impl From<GatewayError> for ResponseEnvelope {
    fn from(err: GatewayError) -> Self {
        let mut body = json!({ "error": err.to_string() });
        if let Some(detail) = err.detail() {
            body["detail"] = Value::String(detail.to_string());
        }
        Self::new(err.status_code(), &body)
    }
}

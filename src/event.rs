use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};

/// The one internal representation every inbound invocation is reduced to
/// before any operation-specific logic runs.
///
/// Exactly one of `action` or `route` drives dispatch. `payload` is always a
/// mapping after normalization, never a raw string. `raw_body` and
/// `signature` are preserved untouched for the webhook path, where the
/// signature is computed over the raw bytes and reparsing would invalidate it.
#[derive(Debug, Clone, Default)]
pub struct CanonicalRequest {
    pub action: Option<String>,
    pub route: Option<String>,
    pub payload: Map<String, Value>,
    pub raw_body: Option<String>,
    pub signature: Option<String>,
}

/// Route hints recognized on gateway-style events, in precedence order.
const ROUTE_KEYS: [&str; 4] = ["route", "routeKey", "resource", "path"];

const SIGNATURE_HEADER: &str = "stripe-signature";

/// Normalizes an arbitrary invocation object. Never fails: absent fields
/// yield `None`s and an undecodable body yields an empty payload.
pub fn normalize(event: &Value) -> CanonicalRequest {
    let Some(obj) = event.as_object() else {
        return CanonicalRequest::default();
    };

    // Explicit direct invocation: {action, payload}. The payload is taken
    // verbatim; no body-string parsing happens on this branch.
    if let Some(action) = obj.get("action").and_then(Value::as_str) {
        let payload = obj
            .get("payload")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        return CanonicalRequest {
            action: Some(action.to_string()),
            payload,
            ..Default::default()
        };
    }

    let route = ROUTE_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    let signature = obj
        .get("headers")
        .and_then(Value::as_object)
        .and_then(|headers| {
            headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(SIGNATURE_HEADER))
                .and_then(|(_, v)| v.as_str())
        })
        .map(str::to_string);

    let (payload, raw_body) = match obj.get("body") {
        // No body key at all: a bare invoke whose fields are the payload.
        None => (obj.clone(), None),
        Some(body) => {
            let raw = decode_body(body, obj);
            let payload = raw
                .as_deref()
                .and_then(|text| serde_json::from_str::<Value>(text).ok())
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default();
            (payload, raw)
        }
    };

    CanonicalRequest {
        action: None,
        route,
        payload,
        raw_body,
        signature,
    }
}

fn decode_body(body: &Value, obj: &Map<String, Value>) -> Option<String> {
    let text = body.as_str()?;
    if text.is_empty() {
        return None;
    }
    let base64_encoded = obj
        .get("isBase64Encoded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if base64_encoded {
        BASE64
            .decode(text)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
    } else {
        Some(text.to_string())
    }
}

/// Non-empty string field lookup used by the adapters. Treats `null` and
/// `""` the same way the original inputs did: as absent.
pub fn str_field<'a>(payload: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    payload.get(name).and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_shape_takes_payload_verbatim() {
        let event = json!({
            "action": "send_email",
            "payload": {"to": "a@b.c", "body": "{not json"}
        });
        let req = normalize(&event);
        assert_eq!(req.action.as_deref(), Some("send_email"));
        assert!(req.route.is_none());
        // The payload's own "body" key is data, not a body string to parse.
        assert_eq!(req.payload["body"], "{not json");
    }

    #[test]
    fn test_action_without_payload_yields_empty_mapping() {
        let req = normalize(&json!({"action": "kyc_token"}));
        assert_eq!(req.action.as_deref(), Some("kyc_token"));
        assert!(req.payload.is_empty());
    }

    #[test]
    fn test_route_precedence() {
        let event = json!({
            "routeKey": "POST /checkout",
            "path": "/ignored",
            "body": "{}"
        });
        let req = normalize(&event);
        assert_eq!(req.route.as_deref(), Some("POST /checkout"));

        let event = json!({"route": "/a", "routeKey": "/b"});
        assert_eq!(normalize(&event).route.as_deref(), Some("/a"));
    }

    #[test]
    fn test_json_body_is_parsed() {
        let event = json!({"path": "/pay", "body": "{\"amount\": 500}"});
        let req = normalize(&event);
        assert_eq!(req.payload["amount"], 500);
        assert_eq!(req.raw_body.as_deref(), Some("{\"amount\": 500}"));
    }

    #[test]
    fn test_base64_body_is_decoded_first() {
        let encoded = BASE64.encode("{\"amount\": 42}");
        let event = json!({"path": "/pay", "body": encoded, "isBase64Encoded": true});
        let req = normalize(&event);
        assert_eq!(req.payload["amount"], 42);
        assert_eq!(req.raw_body.as_deref(), Some("{\"amount\": 42}"));
    }

    #[test]
    fn test_undecodable_body_recovers_to_empty_payload() {
        let event = json!({"path": "/pay", "body": "not json at all"});
        let req = normalize(&event);
        assert!(req.payload.is_empty());
        // The raw string survives for signature verification regardless.
        assert_eq!(req.raw_body.as_deref(), Some("not json at all"));
    }

    #[test]
    fn test_bare_invocation_is_its_own_payload() {
        let event = json!({"amount": 100, "currency": "eur"});
        let req = normalize(&event);
        assert!(req.action.is_none());
        assert!(req.route.is_none());
        assert_eq!(req.payload["amount"], 100);
    }

    #[test]
    fn test_signature_header_lookup_is_case_insensitive() {
        let event = json!({
            "path": "/StripeWebhook",
            "body": "{}",
            "headers": {"Stripe-Signature": "t=1,v1=abc"}
        });
        let req = normalize(&event);
        assert_eq!(req.signature.as_deref(), Some("t=1,v1=abc"));
    }

    #[test]
    fn test_non_object_event() {
        let req = normalize(&json!("just a string"));
        assert!(req.action.is_none());
        assert!(req.route.is_none());
        assert!(req.payload.is_empty());
    }
}

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value, json};

use crate::error::{GatewayError, Result};
use crate::event::{CanonicalRequest, str_field};
use crate::forward::{ForwarderArc, spawn_forward};
use crate::http::{Auth, HttpTransport};

pub const PROVIDER: &str = "KYC provider";

/// Fixed outward widening applied to caller-supplied search windows, to
/// tolerate clock skew between caller and provider.
const SEARCH_MARGIN_MINUTES: i64 = 5;

/// Inert profile block the provider requires on every assessment.
const PROFILE_TYPE: &str = "standard";
const PROFILE_CHANNEL: &str = "web";

fn require_url<'a>(payload: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    let url = str_field(payload, field)
        .ok_or_else(|| GatewayError::MissingParameter(field.to_string()))?;
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(url)
    } else {
        Err(GatewayError::Validation(format!(
            "{field} must be an absolute http(s) URL"
        )))
    }
}

/// Caller-supplied token type + access token, applied verbatim as the
/// authorization header. This layer caches and refreshes nothing.
fn caller_auth(payload: &Map<String, Value>) -> Auth {
    Auth::Token {
        token_type: str_field(payload, "token_type").unwrap_or_default().to_string(),
        token: str_field(payload, "access_token").unwrap_or_default().to_string(),
    }
}

/// Token issuance: form-urlencoded client-credentials exchange.
pub async fn token(transport: &dyn HttpTransport, payload: &Map<String, Value>) -> Result<Value> {
    tracing::info!("kyc: token");
    let url = require_url(payload, "url")?;
    let mut params = vec![
        ("grant_type".to_string(), "client_credentials".to_string()),
        (
            "client_id".to_string(),
            str_field(payload, "client_id").unwrap_or_default().to_string(),
        ),
        (
            "client_secret".to_string(),
            str_field(payload, "client_secret").unwrap_or_default().to_string(),
        ),
    ];
    if let Some(scope) = str_field(payload, "scope") {
        params.push(("scope".to_string(), scope.to_string()));
    }
    transport.post_form(PROVIDER, url, &Auth::None, &params).await
}

/// Assessment creation: nested JSON body, caller auth.
pub async fn create_assessment(
    transport: &dyn HttpTransport,
    payload: &Map<String, Value>,
) -> Result<Value> {
    tracing::info!("kyc: create assessment");
    let url = require_url(payload, "url")?;

    let mut applicant = json!({
        "email": str_field(payload, "email").unwrap_or_default(),
    });
    for field in ["first_name", "last_name", "phone", "date_of_birth"] {
        if let Some(value) = str_field(payload, field) {
            applicant[field] = Value::String(value.to_string());
        }
    }

    let mut body = json!({
        "assessment": {
            "applicant": applicant,
            "profile": {
                "type": PROFILE_TYPE,
                "channel": PROFILE_CHANNEL,
            },
        }
    });
    if let Some(reference) = str_field(payload, "reference") {
        body["assessment"]["reference"] = Value::String(reference.to_string());
    }

    transport
        .post_json(PROVIDER, url, &caller_auth(payload), &body)
        .await
}

/// Assessment search with the fixed five-minute outward window widening.
pub async fn search_assessments(
    transport: &dyn HttpTransport,
    payload: &Map<String, Value>,
) -> Result<Value> {
    tracing::info!("kyc: search assessments");
    let url = require_url(payload, "url")?;
    let from = str_field(payload, "from_date").unwrap_or_default();
    let to = str_field(payload, "to_date").unwrap_or_default();
    let (from, to) = widen_window(from, to)?;

    let mut body = json!({
        "from_date": from,
        "to_date": to,
    });
    if let Some(status) = str_field(payload, "status") {
        body["status"] = Value::String(status.to_string());
    }

    transport
        .post_json(PROVIDER, url, &caller_auth(payload), &body)
        .await
}

/// Retrieves one assessment's result.
pub async fn assessment_result(
    transport: &dyn HttpTransport,
    payload: &Map<String, Value>,
) -> Result<Value> {
    tracing::info!("kyc: assessment result");
    let url = require_url(payload, "url")?;
    let id = str_field(payload, "assessment_id").unwrap_or_default();
    let url = format!("{}/{id}", url.trim_end_matches('/'));
    transport.get_json(PROVIDER, &url, &caller_auth(payload)).await
}

/// Report generation for a single assessment or a batch of them.
pub async fn assessment_report(
    transport: &dyn HttpTransport,
    payload: &Map<String, Value>,
) -> Result<Value> {
    tracing::info!("kyc: assessment report");
    let url = require_url(payload, "url")?;
    let format = str_field(payload, "format").unwrap_or("pdf");

    let body = if let Some(id) = str_field(payload, "assessment_id") {
        json!({ "assessment_id": id, "format": format })
    } else if let Some(ids) = payload.get("assessment_ids").and_then(Value::as_array)
        && !ids.is_empty()
    {
        json!({ "assessment_ids": ids, "format": format })
    } else {
        return Err(GatewayError::MissingParameter("assessment_id".to_string()));
    };

    transport
        .post_json(PROVIDER, url, &caller_auth(payload), &body)
        .await
}

/// Inbound provider callback: acknowledge and forward best-effort, mirroring
/// the webhook discipline. The provider authenticates its callbacks out of
/// band, so there is nothing to verify here.
pub async fn callback(
    forwarder: Option<ForwarderArc>,
    request: &CanonicalRequest,
) -> Result<Value> {
    tracing::info!("kyc: callback");
    let assessment_id = request
        .payload
        .get("assessment_id")
        .cloned()
        .unwrap_or(Value::Null);
    let status = request.payload.get("status").cloned().unwrap_or(Value::Null);

    let ack = json!({
        "received": true,
        "assessment_id": assessment_id,
        "status": status,
    });

    spawn_forward(forwarder, Value::Object(request.payload.clone()));

    Ok(ack)
}

/// Widens `[from, to]` outward by the fixed margin and renders both bounds
/// in the provider's timestamp format (seven fractional digits, UTC).
pub fn widen_window(from: &str, to: &str) -> Result<(String, String)> {
    let margin = Duration::minutes(SEARCH_MARGIN_MINUTES);
    let from = parse_timestamp(from, "from_date")? - margin;
    let to = parse_timestamp(to, "to_date")? + margin;
    Ok((format_upstream(&from), format_upstream(&to)))
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            GatewayError::Validation(format!("{field} must be an RFC 3339 timestamp"))
        })
}

fn format_upstream(dt: &DateTime<Utc>) -> String {
    // The provider expects exactly seven fractional digits.
    format!(
        "{}.{:07}Z",
        dt.format("%Y-%m-%dT%H:%M:%S"),
        dt.timestamp_subsec_nanos() / 100
    )
}

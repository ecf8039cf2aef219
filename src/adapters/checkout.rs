use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::event::str_field;
use crate::http::{Auth, HttpTransport};

pub const PROVIDER: &str = "Stripe";

const DEFAULT_MODE: &str = "payment";
const DEFAULT_PRODUCT_NAME: &str = "Stripe Checkout";

/// Creates a checkout session.
///
/// The amount is taken from the direct `amount` field or, failing that, the
/// nested `price_data.unit_amount` field; it must be a positive integer in
/// the smallest currency unit. Callers either supply their own line items
/// (as an array, or already indexed in the provider's form encoding) or get
/// a single default line item built from amount/currency/product name. On
/// success the provider's session object is returned unmodified.
pub async fn create_session(
    config: &Config,
    transport: &dyn HttpTransport,
    payload: &Map<String, Value>,
) -> Result<Value> {
    tracing::info!("checkout: start");
    let api_key = config.stripe_api_key()?;

    let amount = parse_amount(payload)?;
    let currency = str_field(payload, "currency").unwrap_or(config.default_currency());

    let success_url = str_field(payload, "success_url");
    let cancel_url = str_field(payload, "cancel_url");
    let (Some(success_url), Some(cancel_url)) = (success_url, cancel_url) else {
        return Err(GatewayError::MissingParameters(
            "success_url, cancel_url".to_string(),
        ));
    };

    let mode = str_field(payload, "mode").unwrap_or(DEFAULT_MODE);

    let mut params = vec![
        ("mode".to_string(), mode.to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
    ];

    push_line_items(payload, amount, currency, &mut params);

    if let Some(types) = payload.get("payment_method_types").and_then(Value::as_array) {
        for (i, t) in types.iter().enumerate() {
            params.push((format!("payment_method_types[{i}]"), scalar(t)));
        }
    }

    if let Some(metadata) = payload.get("metadata").and_then(Value::as_object) {
        for (key, value) in metadata {
            params.push((format!("metadata[{key}]"), scalar(value)));
        }
    }

    if let Some(email) = str_field(payload, "customer_email") {
        params.push(("customer_email".to_string(), email.to_string()));
    }

    let url = format!("{}/checkout/sessions", config.stripe_api_base());
    let session = transport
        .post_form(PROVIDER, &url, &Auth::Bearer(api_key.to_string()), &params)
        .await?;
    tracing::info!(
        session = session.get("id").and_then(serde_json::Value::as_str).unwrap_or_default(),
        "checkout: created session"
    );
    Ok(session)
}

fn parse_amount(payload: &Map<String, Value>) -> Result<i64> {
    // Direct field first, then the nested price-data form.
    let raw = payload
        .get("amount")
        .filter(|v| !v.is_null())
        .or_else(|| {
            payload
                .get("price_data")
                .and_then(|pd| pd.get("unit_amount"))
                .filter(|v| !v.is_null())
        })
        .ok_or_else(|| GatewayError::MissingParameter("amount".to_string()))?;

    let amount = as_integer(raw).ok_or_else(|| {
        GatewayError::Validation("amount must be an integer (in smallest currency unit)".to_string())
    })?;
    if amount <= 0 {
        return Err(GatewayError::Validation(
            "amount must be greater than 0".to_string(),
        ));
    }
    Ok(amount)
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn push_line_items(
    payload: &Map<String, Value>,
    amount: i64,
    currency: &str,
    params: &mut Vec<(String, String)>,
) {
    // Callers that already speak the provider's indexed form encoding are
    // passed through untouched.
    let indexed: Vec<_> = payload
        .iter()
        .filter(|(key, _)| key.starts_with("line_items["))
        .collect();
    if !indexed.is_empty() {
        for (key, value) in indexed {
            params.push((key.clone(), scalar(value)));
        }
        return;
    }

    if let Some(items) = payload.get("line_items").and_then(Value::as_array)
        && !items.is_empty()
    {
        for (i, item) in items.iter().enumerate() {
            flatten(&format!("line_items[{i}]"), item, params);
        }
        return;
    }

    let name = str_field(payload, "product_name").unwrap_or(DEFAULT_PRODUCT_NAME);
    params.push(("line_items[0][quantity]".to_string(), "1".to_string()));
    params.push((
        "line_items[0][price_data][currency]".to_string(),
        currency.to_string(),
    ));
    params.push((
        "line_items[0][price_data][unit_amount]".to_string(),
        amount.to_string(),
    ));
    params.push((
        "line_items[0][price_data][product_data][name]".to_string(),
        name.to_string(),
    ));
}

/// Expands a JSON value into the provider's indexed form encoding.
fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten(&format!("{prefix}[{key}]"), nested, out);
            }
        }
        Value::Array(items) => {
            for (i, nested) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{i}]"), nested, out);
            }
        }
        Value::Null => {}
        scalar_value => out.push((prefix.to_string(), scalar(scalar_value))),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_amount_prefers_direct_field() {
        let payload = json!({"amount": 500, "price_data": {"unit_amount": 900}})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(parse_amount(&payload).unwrap(), 500);
    }

    #[test]
    fn test_amount_falls_back_to_price_data() {
        let payload = json!({"price_data": {"unit_amount": "750"}})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(parse_amount(&payload).unwrap(), 750);
    }

    #[test]
    fn test_amount_missing() {
        let payload = json!({"currency": "usd"}).as_object().cloned().unwrap();
        let err = parse_amount(&payload).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: amount");
    }

    #[test]
    fn test_amount_not_an_integer() {
        for bad in [json!({"amount": "12.5"}), json!({"amount": 12.5}), json!({"amount": []})] {
            let payload = bad.as_object().cloned().unwrap();
            let err = parse_amount(&payload).unwrap_err();
            assert_eq!(
                err.to_string(),
                "amount must be an integer (in smallest currency unit)"
            );
        }
    }

    #[test]
    fn test_amount_must_be_positive() {
        for bad in [0, -5] {
            let payload = json!({"amount": bad}).as_object().cloned().unwrap();
            let err = parse_amount(&payload).unwrap_err();
            assert_eq!(err.to_string(), "amount must be greater than 0");
        }
    }

    #[test]
    fn test_flatten_nested_line_item() {
        let item = json!({
            "quantity": 2,
            "price_data": {"currency": "eur", "unit_amount": 1200}
        });
        let mut out = Vec::new();
        flatten("line_items[0]", &item, &mut out);
        out.sort();
        assert_eq!(
            out,
            vec![
                ("line_items[0][price_data][currency]".to_string(), "eur".to_string()),
                ("line_items[0][price_data][unit_amount]".to_string(), "1200".to_string()),
                ("line_items[0][quantity]".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_indexed_keys_pass_through_verbatim() {
        let payload = json!({
            "line_items[0][price_data][unit_amount]": 999,
            "line_items[0][quantity]": "3",
            "amount": 999
        })
        .as_object()
        .cloned()
        .unwrap();
        let mut params = Vec::new();
        push_line_items(&payload, 999, "usd", &mut params);
        params.sort();
        assert_eq!(
            params,
            vec![
                ("line_items[0][price_data][unit_amount]".to_string(), "999".to_string()),
                ("line_items[0][quantity]".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_line_item() {
        let payload = json!({"amount": 500, "product_name": "Sticker"})
            .as_object()
            .cloned()
            .unwrap();
        let mut params = Vec::new();
        push_line_items(&payload, 500, "gbp", &mut params);
        assert!(params.contains(&(
            "line_items[0][price_data][product_data][name]".to_string(),
            "Sticker".to_string()
        )));
        assert!(params.contains(&(
            "line_items[0][price_data][currency]".to_string(),
            "gbp".to_string()
        )));
    }
}

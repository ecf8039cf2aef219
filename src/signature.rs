use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{GatewayError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signed payloads older or newer than this are rejected even when the
/// signature itself is valid.
pub const TOLERANCE_SECS: i64 = 300;

/// Verifies a `t=<unix>,v1=<hex>` signature header against the raw request
/// body. The signature covers the exact bytes `"{t}.{body}"`, which is why
/// the body must never be reparsed or re-serialized before this point.
pub fn verify(body: &str, header: &str, secret: &str) -> Result<()> {
    verify_at(body, header, secret, unix_now())
}

pub fn verify_at(body: &str, header: &str, secret: &str, now: i64) -> Result<()> {
    let (timestamp, signature) = parse_header(header)?;

    if (now - timestamp).abs() > TOLERANCE_SECS {
        return Err(invalid("timestamp outside tolerance"));
    }

    let expected = hex::decode(signature).map_err(|_| invalid("malformed v1 signature"))?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| invalid("bad signing key"))?;
    mac.update(format!("{timestamp}.{body}").as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| invalid("signature mismatch"))
}

/// Produces a header that [`verify`] accepts. Used by integration tests and
/// local tooling to exercise the webhook path without the real provider.
pub fn sign(body: &str, secret: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{timestamp}.{body}").as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}

fn parse_header(header: &str) -> Result<(i64, &str)> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }
    match (timestamp, signature) {
        (Some(t), Some(v1)) => Ok((t, v1)),
        _ => Err(invalid("unparseable signature header")),
    }
}

fn invalid(detail: &str) -> GatewayError {
    GatewayError::InvalidSignature {
        detail: detail.to_string(),
    }
}

pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// Outbound calls use a short bounded timeout and exactly one attempt; the
/// gateway has no retry policy because not every downstream operation is
/// idempotent.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How a request authenticates against its provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
    Basic { user: String, password: String },
    /// Caller-supplied token type + access token pair, applied verbatim as
    /// the authorization header. Nothing is cached or refreshed here.
    Token { token_type: String, token: String },
}

impl Auth {
    fn header_value(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Bearer(key) => Some(format!("Bearer {key}")),
            Self::Basic { user, password } => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{user}:{password}"));
                Some(format!("Basic {encoded}"))
            }
            Self::Token { token_type, token } => Some(format!("{token_type} {token}")),
        }
    }
}

/// The seam between adapters and the network. Every provider call goes
/// through one of these three shapes; tests substitute an in-memory fake.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_form(
        &self,
        provider: &'static str,
        url: &str,
        auth: &Auth,
        params: &[(String, String)],
    ) -> Result<Value>;

    async fn post_json(
        &self,
        provider: &'static str,
        url: &str,
        auth: &Auth,
        body: &Value,
    ) -> Result<Value>;

    async fn get_json(&self, provider: &'static str, url: &str, auth: &Auth) -> Result<Value>;
}

pub type TransportBox = Box<dyn HttpTransport>;

/// Percent-encodes form parameters in order.
pub fn encode_form(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Production transport backed by a shared `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::provider("HTTP client", e.to_string()))?;
        Ok(Self { client })
    }

    async fn finish(
        provider: &'static str,
        url: &str,
        response: reqwest::Response,
    ) -> Result<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::provider(provider, e.to_string()))?;
        tracing::info!(provider, url, status = status.as_u16(), "outbound call");
        if !status.is_success() {
            return Err(GatewayError::provider(
                provider,
                format!("status {status}: {text}"),
            ));
        }
        if text.is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&text)
            .map_err(|e| GatewayError::provider(provider, format!("invalid response: {e}")))
    }

    fn apply_auth(request: reqwest::RequestBuilder, auth: &Auth) -> reqwest::RequestBuilder {
        match auth.header_value() {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(
        &self,
        provider: &'static str,
        url: &str,
        auth: &Auth,
        params: &[(String, String)],
    ) -> Result<Value> {
        let request = Self::apply_auth(self.client.post(url), auth)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(encode_form(params));
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::provider(provider, e.to_string()))?;
        Self::finish(provider, url, response).await
    }

    async fn post_json(
        &self,
        provider: &'static str,
        url: &str,
        auth: &Auth,
        body: &Value,
    ) -> Result<Value> {
        let request = Self::apply_auth(self.client.post(url), auth).json(body);
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::provider(provider, e.to_string()))?;
        Self::finish(provider, url, response).await
    }

    async fn get_json(&self, provider: &'static str, url: &str, auth: &Auth) -> Result<Value> {
        let request = Self::apply_auth(self.client.get(url), auth);
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::provider(provider, e.to_string()))?;
        Self::finish(provider, url, response).await
    }
}

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use payrelay::config::Config;
use payrelay::error::{GatewayError, Result};
use payrelay::forward::{EventForwarder, ForwarderArc};
use payrelay::gateway::Gateway;
use payrelay::http::{Auth, HttpTransport};
use payrelay::mailer::JsonMailer;
use serde_json::Value;
use tokio::sync::Notify;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// A configuration with every setting present, as tests usually want.
pub fn test_config() -> Config {
    Config {
        stripe_api_key: Some("sk_test_key".into()),
        stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
        stripe_api_base: Some("https://stripe.test/v1".into()),
        default_currency: Some("usd".into()),
        webhook_forward_url: None,
        email_provider: Default::default(),
        email_api_key: Some("mail_key".into()),
        email_api_base: Some("https://mail.test".into()),
        email_sender: Some("noreply@payrelay.test".into()),
        email_region: Some("eu-west-1".into()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SentBody {
    Form(Vec<(String, String)>),
    Json(Value),
    None,
}

#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: &'static str,
    pub provider: &'static str,
    pub url: String,
    pub auth: Auth,
    pub body: SentBody,
}

impl SentRequest {
    /// Form field lookup by exact key.
    pub fn form_field(&self, key: &str) -> Option<&str> {
        match &self.body {
            SentBody::Form(params) => params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn json_body(&self) -> &Value {
        match &self.body {
            SentBody::Json(body) => body,
            _ => panic!("request had no JSON body"),
        }
    }
}

/// In-memory transport: records every request and answers each one with a
/// canned response (or a canned failure).
#[derive(Clone, Default)]
pub struct FakeTransport {
    pub requests: Arc<Mutex<Vec<SentRequest>>>,
    pub response: Value,
    pub fail_with: Option<String>,
}

impl FakeTransport {
    pub fn returning(response: Value) -> Self {
        Self {
            response,
            ..Default::default()
        }
    }

    pub fn failing(detail: &str) -> Self {
        Self {
            fail_with: Some(detail.to_string()),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn single_request(&self) -> SentRequest {
        let sent = self.sent();
        assert_eq!(sent.len(), 1, "expected exactly one outbound request");
        sent.into_iter().next().unwrap()
    }

    fn record(&self, request: SentRequest) -> Result<Value> {
        let provider = request.provider;
        self.requests.lock().unwrap().push(request);
        match &self.fail_with {
            Some(detail) => Err(GatewayError::provider(provider, detail.clone())),
            None => Ok(self.response.clone()),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn post_form(
        &self,
        provider: &'static str,
        url: &str,
        auth: &Auth,
        params: &[(String, String)],
    ) -> Result<Value> {
        self.record(SentRequest {
            method: "POST",
            provider,
            url: url.to_string(),
            auth: auth.clone(),
            body: SentBody::Form(params.to_vec()),
        })
    }

    async fn post_json(
        &self,
        provider: &'static str,
        url: &str,
        auth: &Auth,
        body: &Value,
    ) -> Result<Value> {
        self.record(SentRequest {
            method: "POST",
            provider,
            url: url.to_string(),
            auth: auth.clone(),
            body: SentBody::Json(body.clone()),
        })
    }

    async fn get_json(&self, provider: &'static str, url: &str, auth: &Auth) -> Result<Value> {
        self.record(SentRequest {
            method: "GET",
            provider,
            url: url.to_string(),
            auth: auth.clone(),
            body: SentBody::None,
        })
    }
}

/// Forwarder that records what it was asked to forward and signals a
/// notifier, so tests can await the detached forward task deterministically.
#[derive(Default)]
pub struct FakeForwarder {
    pub forwarded: Arc<Mutex<Vec<Value>>>,
    pub notify: Arc<Notify>,
    pub fail: bool,
}

impl FakeForwarder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Waits until the forward task has run, then returns what it received.
    pub async fn wait_forwarded(&self) -> Vec<Value> {
        tokio::time::timeout(std::time::Duration::from_secs(1), self.notify.notified())
            .await
            .expect("forward task never ran");
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventForwarder for FakeForwarder {
    async fn forward(&self, event: Value) -> Result<()> {
        self.forwarded.lock().unwrap().push(event);
        self.notify.notify_one();
        if self.fail {
            return Err(GatewayError::provider("Forward target", "unreachable"));
        }
        Ok(())
    }
}

/// Wires a gateway over fakes: shared config, the given transport, an
/// optional forwarder, and the JSON mailer backend on the same transport.
pub fn gateway(config: Config, transport: Arc<FakeTransport>) -> Gateway {
    gateway_with_forwarder(config, transport, None)
}

pub fn gateway_with_forwarder(
    config: Config,
    transport: Arc<FakeTransport>,
    forwarder: Option<ForwarderArc>,
) -> Gateway {
    let config = Arc::new(config);
    let mailer = Box::new(JsonMailer::new(config.clone(), transport.clone()));
    Gateway::new(config, transport, forwarder, mailer)
}

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::Config;
use crate::error::Result;
use crate::http::{Auth, HttpTransport};

pub const PROVIDER: &str = "Email provider";

/// A fully resolved outbound message, sender included.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub sender: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub html: bool,
}

/// The email seam. One primitive for plain messages, one for raw MIME
/// (attachments). Both backends resolve their settings at call time, so a
/// deployment that never sends email needs none of them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_simple(&self, email: &OutgoingEmail) -> Result<Value>;
    async fn send_raw(&self, sender: &str, to: &str, mime: &str) -> Result<Value>;
}

pub type MailerBox = Box<dyn Mailer>;

const MIME_BOUNDARY: &str = "=_payrelay_part";

/// Builds a multipart/mixed message embedding one base64-encoded attachment.
pub fn build_mime(email: &OutgoingEmail, filename: &str, content_base64: &str) -> String {
    let body_type = if email.html {
        "text/html"
    } else {
        "text/plain"
    };
    format!(
        "From: {from}\r\n\
         To: {to}\r\n\
         Subject: {subject}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\
         \r\n\
         --{boundary}\r\n\
         Content-Type: {body_type}; charset=utf-8\r\n\
         \r\n\
         {body}\r\n\
         --{boundary}\r\n\
         Content-Type: application/octet-stream\r\n\
         Content-Disposition: attachment; filename=\"{filename}\"\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n\
         {content}\r\n\
         --{boundary}--\r\n",
        from = email.sender,
        to = email.to,
        subject = email.subject,
        boundary = MIME_BOUNDARY,
        body = email.body,
        content = content_base64,
    )
}

/// Provider A: JSON body, bearer-key auth.
pub struct JsonMailer {
    config: Arc<Config>,
    transport: Arc<dyn HttpTransport>,
}

impl JsonMailer {
    pub fn new(config: Arc<Config>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }
}

#[async_trait]
impl Mailer for JsonMailer {
    async fn send_simple(&self, email: &OutgoingEmail) -> Result<Value> {
        let base = self.config.email_api_base()?;
        let auth = Auth::Bearer(self.config.email_api_key()?.to_string());
        let slot = if email.html { "html" } else { "text" };
        let mut body = json!({
            "from": email.sender,
            "to": email.to,
            "subject": email.subject,
        });
        body[slot] = Value::String(email.body.clone());
        self.transport
            .post_json(PROVIDER, &format!("{base}/send"), &auth, &body)
            .await
    }

    async fn send_raw(&self, sender: &str, to: &str, mime: &str) -> Result<Value> {
        let base = self.config.email_api_base()?;
        let auth = Auth::Bearer(self.config.email_api_key()?.to_string());
        use base64::Engine;
        let body = json!({
            "from": sender,
            "to": to,
            "raw": base64::engine::general_purpose::STANDARD.encode(mime),
        });
        self.transport
            .post_json(PROVIDER, &format!("{base}/send-raw"), &auth, &body)
            .await
    }
}

/// Provider B: form-encoded body, basic auth, region-qualified endpoint. A
/// literal `{region}` in the configured base URL is replaced with the
/// configured region.
pub struct FormMailer {
    config: Arc<Config>,
    transport: Arc<dyn HttpTransport>,
}

impl FormMailer {
    pub fn new(config: Arc<Config>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        let base = self.config.email_api_base()?;
        let base = if base.contains("{region}") {
            base.replace("{region}", self.config.email_region()?)
        } else {
            base.to_string()
        };
        Ok(format!("{base}{path}"))
    }

    fn auth(&self) -> Result<Auth> {
        Ok(Auth::Basic {
            user: "api".to_string(),
            password: self.config.email_api_key()?.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for FormMailer {
    async fn send_simple(&self, email: &OutgoingEmail) -> Result<Value> {
        let slot = if email.html { "html" } else { "text" };
        let params = vec![
            ("from".to_string(), email.sender.clone()),
            ("to".to_string(), email.to.clone()),
            ("subject".to_string(), email.subject.clone()),
            (slot.to_string(), email.body.clone()),
        ];
        self.transport
            .post_form(PROVIDER, &self.endpoint("/messages")?, &self.auth()?, &params)
            .await
    }

    async fn send_raw(&self, _sender: &str, to: &str, mime: &str) -> Result<Value> {
        let params = vec![
            ("to".to_string(), to.to_string()),
            ("message".to_string(), mime.to_string()),
        ];
        self.transport
            .post_form(
                PROVIDER,
                &self.endpoint("/messages.mime")?,
                &self.auth()?,
                &params,
            )
            .await
    }
}

use crate::error::{GatewayError, Result};

pub const ENV_STRIPE_API_KEY: &str = "STRIPE_API_KEY";
pub const ENV_STRIPE_WEBHOOK_SECRET: &str = "STRIPE_WEBHOOK_SECRET";
pub const ENV_STRIPE_DEFAULT_CURRENCY: &str = "STRIPE_DEFAULT_CURRENCY";
pub const ENV_STRIPE_API_BASE: &str = "STRIPE_API_BASE";
pub const ENV_WEBHOOK_FORWARD_URL: &str = "WEBHOOK_FORWARD_URL";
pub const ENV_EMAIL_PROVIDER: &str = "EMAIL_PROVIDER";
pub const ENV_EMAIL_API_KEY: &str = "EMAIL_API_KEY";
pub const ENV_EMAIL_API_BASE: &str = "EMAIL_API_BASE";
pub const ENV_EMAIL_SENDER: &str = "EMAIL_SENDER";
pub const ENV_EMAIL_REGION: &str = "EMAIL_REGION";

pub const DEFAULT_CURRENCY: &str = "usd";
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Which mailer backend the process uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailProvider {
    /// JSON body, bearer-key auth.
    #[default]
    Json,
    /// Form-encoded body, basic auth, region-qualified endpoint.
    Form,
}

/// Process-wide configuration, read from the environment exactly once at
/// startup and passed by reference from then on. Adapters never consult the
/// environment themselves, so tests can hand them a struct literal.
///
/// Settings are stored as `Option` and only promoted to errors by the
/// accessors below, at the moment an operation actually needs them: a
/// deployment that only serves checkouts does not need an email sender.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub stripe_api_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: Option<String>,
    pub default_currency: Option<String>,
    pub webhook_forward_url: Option<String>,
    pub email_provider: EmailProvider,
    pub email_api_key: Option<String>,
    pub email_api_base: Option<String>,
    pub email_sender: Option<String>,
    pub email_region: Option<String>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let email_provider = match env_var(ENV_EMAIL_PROVIDER).as_deref() {
            Some("form") => EmailProvider::Form,
            _ => EmailProvider::Json,
        };
        Self {
            stripe_api_key: env_var(ENV_STRIPE_API_KEY),
            stripe_webhook_secret: env_var(ENV_STRIPE_WEBHOOK_SECRET),
            stripe_api_base: env_var(ENV_STRIPE_API_BASE),
            default_currency: env_var(ENV_STRIPE_DEFAULT_CURRENCY),
            webhook_forward_url: env_var(ENV_WEBHOOK_FORWARD_URL),
            email_provider,
            email_api_key: env_var(ENV_EMAIL_API_KEY),
            email_api_base: env_var(ENV_EMAIL_API_BASE),
            email_sender: env_var(ENV_EMAIL_SENDER),
            email_region: env_var(ENV_EMAIL_REGION),
        }
    }

    pub fn stripe_api_key(&self) -> Result<&str> {
        self.stripe_api_key
            .as_deref()
            .ok_or(GatewayError::Config(ENV_STRIPE_API_KEY))
    }

    pub fn stripe_webhook_secret(&self) -> Result<&str> {
        self.stripe_webhook_secret
            .as_deref()
            .ok_or(GatewayError::Config(ENV_STRIPE_WEBHOOK_SECRET))
    }

    pub fn stripe_api_base(&self) -> &str {
        self.stripe_api_base
            .as_deref()
            .unwrap_or(DEFAULT_STRIPE_API_BASE)
    }

    pub fn default_currency(&self) -> &str {
        self.default_currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn email_api_key(&self) -> Result<&str> {
        self.email_api_key
            .as_deref()
            .ok_or(GatewayError::Config(ENV_EMAIL_API_KEY))
    }

    pub fn email_api_base(&self) -> Result<&str> {
        self.email_api_base
            .as_deref()
            .ok_or(GatewayError::Config(ENV_EMAIL_API_BASE))
    }

    pub fn email_sender(&self) -> Result<&str> {
        self.email_sender
            .as_deref()
            .ok_or(GatewayError::Config(ENV_EMAIL_SENDER))
    }

    pub fn email_region(&self) -> Result<&str> {
        self.email_region
            .as_deref()
            .ok_or(GatewayError::Config(ENV_EMAIL_REGION))
    }
}

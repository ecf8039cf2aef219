use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Everything that can go wrong while handling one invocation.
///
/// Each variant carries a fixed caller-facing status code; adapters convert
/// provider and transport failures into these variants at their boundary, so
/// no foreign error type ever crosses out of an adapter.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// A setting required by the invoked operation is absent. The message
    /// names the environment variable, never its value.
    #[error("{0} is not set")]
    Config(&'static str),
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
    #[error("Missing required parameters: {0}")]
    MissingParameters(String),
    #[error("{0}")]
    Validation(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Invalid webhook signature")]
    InvalidSignature { detail: String },
    #[error("{provider} error")]
    Provider { provider: &'static str, detail: String },
}

impl GatewayError {
    pub fn provider(provider: &'static str, detail: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            detail: detail.into(),
        }
    }

    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) | Self::Provider { .. } => 500,
            Self::MissingParameter(_)
            | Self::MissingParameters(_)
            | Self::Validation(_)
            | Self::UnknownAction(_)
            | Self::InvalidSignature { .. } => 400,
        }
    }

    /// Underlying message attached to the response body as `detail`, when
    /// there is one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Provider { detail, .. } | Self::InvalidSignature { detail } => Some(detail),
            _ => None,
        }
    }
}

use serde_json::{Map, Value};

use crate::error::{GatewayError, Result};

/// The closed set of operations this gateway can perform.
///
/// Direct invocations name one of these; gateway-style events resolve to one
/// through [`Action::from_route`]. Anything the type system does not know
/// about fails dispatch as an unknown action before any adapter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateCheckoutSession,
    HandleWebhook,
    SendEmail,
    KycToken,
    KycCreateAssessment,
    KycSearchAssessments,
    KycAssessmentResult,
    KycAssessmentReport,
    KycCallback,
}

/// Route markers, checked against the lower-cased route in this order.
/// Webhook wins over callback wins over smtp; anything else falls back to
/// checkout creation, the original single-endpoint behavior.
const ROUTE_MARKERS: [(&str, Action); 3] = [
    ("webhook", Action::HandleWebhook),
    ("callback", Action::KycCallback),
    ("smtp", Action::SendEmail),
];

/// Required/optional field contract for one action, applied by the
/// dispatcher before the adapter is invoked.
pub struct ActionContract {
    pub required: &'static [&'static str],
    pub optional: &'static [(&'static str, &'static str)],
}

impl Action {
    /// Case-sensitive lookup of a caller-supplied action name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "create_checkout_session" => Ok(Self::CreateCheckoutSession),
            "handle_webhook" => Ok(Self::HandleWebhook),
            "send_email" => Ok(Self::SendEmail),
            "kyc_token" => Ok(Self::KycToken),
            "kyc_create_assessment" => Ok(Self::KycCreateAssessment),
            "kyc_search_assessments" => Ok(Self::KycSearchAssessments),
            "kyc_assessment_result" => Ok(Self::KycAssessmentResult),
            "kyc_assessment_report" => Ok(Self::KycAssessmentReport),
            "kyc_callback" => Ok(Self::KycCallback),
            other => Err(GatewayError::UnknownAction(other.to_string())),
        }
    }

    /// Case-insensitive substring match on a route value. Always resolves.
    pub fn from_route(route: &str) -> Self {
        let route = route.to_ascii_lowercase();
        ROUTE_MARKERS
            .iter()
            .find(|(marker, _)| route.contains(marker))
            .map(|(_, action)| *action)
            .unwrap_or(Self::CreateCheckoutSession)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateCheckoutSession => "create_checkout_session",
            Self::HandleWebhook => "handle_webhook",
            Self::SendEmail => "send_email",
            Self::KycToken => "kyc_token",
            Self::KycCreateAssessment => "kyc_create_assessment",
            Self::KycSearchAssessments => "kyc_search_assessments",
            Self::KycAssessmentResult => "kyc_assessment_result",
            Self::KycAssessmentReport => "kyc_assessment_report",
            Self::KycCallback => "kyc_callback",
        }
    }

    /// The static parameter contract for this action.
    ///
    /// Checkout and webhook keep empty contracts: checkout accepts its amount
    /// from two alternative fields and reports a combined URL error, webhook
    /// operates on the raw body, so both validate inside the adapter. The
    /// report action likewise accepts a single id or an id batch.
    pub const fn contract(self) -> ActionContract {
        match self {
            Self::CreateCheckoutSession | Self::HandleWebhook | Self::KycCallback => {
                ActionContract { required: &[], optional: &[] }
            }
            Self::SendEmail => ActionContract {
                required: &["to", "subject", "body"],
                optional: &[("html", "false")],
            },
            Self::KycToken => ActionContract {
                required: &["url", "client_id", "client_secret"],
                optional: &[],
            },
            Self::KycCreateAssessment => ActionContract {
                required: &["url", "token_type", "access_token", "email"],
                optional: &[],
            },
            Self::KycSearchAssessments => ActionContract {
                required: &["url", "token_type", "access_token", "from_date", "to_date"],
                optional: &[],
            },
            Self::KycAssessmentResult => ActionContract {
                required: &["url", "token_type", "access_token", "assessment_id"],
                optional: &[],
            },
            Self::KycAssessmentReport => ActionContract {
                required: &["url", "token_type", "access_token"],
                optional: &[("format", "pdf")],
            },
        }
    }
}

/// Applies an action's contract to a payload: every required field must be
/// present and non-empty, and absent optionals are filled with their
/// defaults. Runs before the adapter, so a contract failure has no side
/// effects.
pub fn apply_contract(action: Action, payload: &mut Map<String, Value>) -> Result<()> {
    let contract = action.contract();
    for field in contract.required {
        let present = payload
            .get(*field)
            .is_some_and(|v| !v.is_null() && v.as_str() != Some(""));
        if !present {
            return Err(GatewayError::MissingParameter((*field).to_string()));
        }
    }
    for (field, default) in contract.optional {
        if !payload.contains_key(*field) {
            payload.insert((*field).to_string(), Value::String((*default).to_string()));
        }
    }
    Ok(())
}

use std::sync::Arc;

use serde_json::Value;

use crate::action::{Action, apply_contract};
use crate::adapters::{checkout, email, kyc, webhook};
use crate::config::Config;
use crate::error::Result;
use crate::event::{CanonicalRequest, normalize};
use crate::forward::ForwarderArc;
use crate::http::HttpTransport;
use crate::mailer::MailerBox;
use crate::response::ResponseEnvelope;

/// The dispatcher. Owns the process-wide configuration and the outbound
/// collaborators, and turns one invocation event into one response envelope.
///
/// Stateless across calls: nothing here is mutated after construction, so a
/// single `Gateway` serves any number of concurrent invocations.
pub struct Gateway {
    config: Arc<Config>,
    transport: Arc<dyn HttpTransport>,
    forwarder: Option<ForwarderArc>,
    mailer: MailerBox,
}

impl Gateway {
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn HttpTransport>,
        forwarder: Option<ForwarderArc>,
        mailer: MailerBox,
    ) -> Self {
        Self {
            config,
            transport,
            forwarder,
            mailer,
        }
    }

    /// Handles one invocation. Infallible at this boundary: every failure
    /// becomes an error envelope.
    pub async fn handle(&self, event: &Value) -> ResponseEnvelope {
        let request = normalize(event);
        match self.dispatch(request).await {
            Ok(body) => ResponseEnvelope::ok(&body),
            Err(err) => {
                tracing::warn!(error = %err, "invocation failed");
                err.into()
            }
        }
    }

    async fn dispatch(&self, mut request: CanonicalRequest) -> Result<Value> {
        let action = match (request.action.as_deref(), request.route.as_deref()) {
            // Explicit action names are matched case-sensitively; an unknown
            // one is an error, never a silent fallback.
            (Some(name), _) => Action::from_name(name)?,
            (None, Some(route)) => Action::from_route(route),
            // The original service had a single checkout endpoint; bare
            // events still land there.
            (None, None) => Action::CreateCheckoutSession,
        };
        tracing::info!(action = action.name(), "dispatch");

        // Contract failures happen before the adapter runs, so they can have
        // no partial side effects.
        apply_contract(action, &mut request.payload)?;

        let config = self.config.as_ref();
        let transport = self.transport.as_ref();
        match action {
            Action::CreateCheckoutSession => {
                checkout::create_session(config, transport, &request.payload).await
            }
            Action::HandleWebhook => {
                webhook::handle(config, self.forwarder.clone(), &request).await
            }
            Action::SendEmail => {
                email::send(config, self.mailer.as_ref(), &request.payload).await
            }
            Action::KycToken => kyc::token(transport, &request.payload).await,
            Action::KycCreateAssessment => {
                kyc::create_assessment(transport, &request.payload).await
            }
            Action::KycSearchAssessments => {
                kyc::search_assessments(transport, &request.payload).await
            }
            Action::KycAssessmentResult => {
                kyc::assessment_result(transport, &request.payload).await
            }
            Action::KycAssessmentReport => {
                kyc::assessment_report(transport, &request.payload).await
            }
            Action::KycCallback => kyc::callback(self.forwarder.clone(), &request).await,
        }
    }
}

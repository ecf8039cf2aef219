use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payrelay::config::{Config, EmailProvider};
use payrelay::forward::{ForwarderArc, HttpForwarder};
use payrelay::gateway::Gateway;
use payrelay::http::ReqwestTransport;
use payrelay::mailer::{FormMailer, JsonMailer, MailerBox};

/// Runs one invocation event through the gateway and prints the response
/// envelope. Stands in for the hosting platform's entry point.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Invocation event JSON file. Reads stdin when omitted.
    event: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let raw = match cli.event {
        Some(path) => std::fs::read_to_string(path).into_diagnostic()?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .into_diagnostic()?;
            buffer
        }
    };
    let event: serde_json::Value = serde_json::from_str(&raw).into_diagnostic()?;

    let config = Arc::new(Config::from_env());
    let transport = Arc::new(ReqwestTransport::new().into_diagnostic()?);

    let forwarder: Option<ForwarderArc> = match &config.webhook_forward_url {
        Some(url) => Some(Arc::new(HttpForwarder::new(url).into_diagnostic()?)),
        None => None,
    };

    let mailer: MailerBox = match config.email_provider {
        EmailProvider::Json => Box::new(JsonMailer::new(config.clone(), transport.clone())),
        EmailProvider::Form => Box::new(FormMailer::new(config.clone(), transport.clone())),
    };

    let gateway = Gateway::new(config, transport, forwarder, mailer);
    let response = gateway.handle(&event).await;

    println!(
        "{}",
        serde_json::to_string(&response).into_diagnostic()?
    );
    Ok(())
}

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use email_response_generator::config::AppConfig;
use email_response_generator::llm::create_provider;
use email_response_generator::manifest::app_manifest;
use email_response_generator::pipeline::Responder;
use email_response_generator::server::{self, Invocations};
use email_response_generator::slack::{SlackApi, SlackClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    eprintln!("📨 Email Response Generator v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} ({:?})", config.llm.model, config.llm.backend);
    eprintln!("   Events: http://0.0.0.0:{}/slack/events", config.port);
    eprintln!("   Manifest: http://0.0.0.0:{}/slack/manifest", config.port);
    eprintln!("   Outgoing domains: {}\n", config.outbound.domains().join(", "));

    let slack: Arc<dyn SlackApi> = Arc::new(
        SlackClient::new(&config.slack, &config.outbound).context("failed to build Slack client")?,
    );
    let llm = create_provider(&config.llm, &config.outbound).context("failed to build LLM provider")?;

    let responder = Arc::new(Responder::new(slack, llm, config.responder.clone()));
    let invocations = Invocations::default();
    let app = server::routes(responder, app_manifest(&config.outbound), invocations.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    info!(port = config.port, "Events server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let drained = invocations.drain().await;
    info!(drained, "Events server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

use axum::{middleware, routing::get};
use axum_helpers::server::{create_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_finops::{
    AwsCostExplorer, BillingService, BillingTools, ChatOrchestrator, FinopsState, HttpChatClient,
};
use observability::{init_metrics, metrics_handler, metrics_middleware};
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod pages;

use config::{Config, ConfigSource};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // Load configuration from config.yml or environment variables
    let config = Config::load()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    match &config.source {
        ConfigSource::File(path) => info!("Loaded LLM and AWS settings from {}", path.display()),
        ConfigSource::Environment => info!("Loaded LLM and AWS settings from environment"),
    }

    if init_metrics().is_none() {
        warn!("Metrics recorder unavailable, /metrics will report nothing");
    }

    let llm = HttpChatClient::new(&config.llm)
        .map_err(|e| eyre::eyre!("Failed to build LLM client: {}", e))?;
    info!(
        model = %config.llm.model,
        timeout_secs = config.llm.timeout.as_secs(),
        "LLM client configured"
    );

    let explorer = AwsCostExplorer::from_config(&config.aws).await;
    info!(region = %config.aws.region, "AWS Cost Explorer client initialized");

    let billing = Arc::new(BillingService::new(Arc::new(explorer)));
    let orchestrator = ChatOrchestrator::new(Arc::new(llm), BillingTools::new(billing.clone()));
    let state = FinopsState::new(orchestrator, billing);

    // create_router adds docs/middleware to our composed routes
    let router = axum_helpers::create_router::<api::ApiDoc>(api::routes(state)).await?;

    // - /: landing page, /static/*: assets
    // - /health: liveness check with app name/version
    // - /metrics: Prometheus scrape endpoint
    let app = router
        .merge(pages::router(&config.assets))
        .merge(health_router(config.app))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(metrics_middleware));

    info!("Starting {} v{}", config.app.name, config.app.version);

    create_app(app, &config.server)
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Cost assistant shutdown complete");
    Ok(())
}

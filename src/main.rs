use std::sync::Arc;

use anyhow::Context;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use data_application_service::app::{app, AppState};
use data_application_service::config;
use data_application_service::database::{DatabaseManager, PgServiceCatalog, PgSubServiceRepository};
use data_application_service::policy::HttpPolicyGate;
use data_application_service::services::{LogEventPublisher, SubServiceService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so local runs pick up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting data-application-service in {:?} mode", config.environment);

    let pool = DatabaseManager::connect(&config.database).await.context("connecting to database")?;
    DatabaseManager::migrate(&pool).await.context("applying migrations")?;

    let policy = HttpPolicyGate::new(&config.policy).context("building policy engine client")?;
    let sub_services = SubServiceService::new(
        Arc::new(PgSubServiceRepository::new(pool.clone())),
        Arc::new(PgServiceCatalog::new(pool)),
        Arc::new(policy),
        Arc::new(LogEventPublisher),
        config.sub_service.clone(),
    );

    if config.security.jwt_secret.is_empty() {
        tracing::warn!("SECURITY_JWT_SECRET is not set; every bearer token will be rejected");
    }
    let state = AppState::new(Arc::new(sub_services), &config.security.jwt_secret)
        .with_audit_logging(config.security.enable_audit_logging);

    let mut router = app(state)
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes))
        .layer(CorsLayer::permissive());
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("data-application-service listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

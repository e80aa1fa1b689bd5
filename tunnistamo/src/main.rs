use service_core::middleware::{
    metrics::install_prometheus_recorder, rate_limit::create_ip_rate_limiter,
};
use service_core::observability::logging::init_tracing;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tunnistamo::{
    build_router,
    config::TunnistamoConfig,
    db::create_pool,
    services::{Database, JwtService, ProviderRegistry, RedisSessionStore},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = TunnistamoConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    let metrics = install_prometheus_recorder()?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting SSO gateway"
    );

    let pool = create_pool(&config.database).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to PostgreSQL");
        service_core::error::AppError::from(e)
    })?;
    let store = Database::new(pool);

    let sessions = RedisSessionStore::new(&config.redis).await?;
    tracing::info!("Session store initialized");

    let jwt = JwtService::new(&config.jwt);

    let providers = ProviderRegistry::from_spec(&config.login.providers);
    if providers.is_empty() {
        tracing::warn!("No login providers registered; /login/ will offer nothing");
    }
    tracing::info!(count = providers.len(), "Login providers registered");

    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );
    let jwt_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.jwt_token_limit,
        config.rate_limit.jwt_token_window_seconds,
    );

    let state = AppState {
        config: config.clone(),
        store: Arc::new(store),
        sessions: Arc::new(sessions),
        jwt,
        providers: Arc::new(providers),
        ip_rate_limiter,
        jwt_rate_limiter,
        metrics: Some(metrics),
    };
    let app = build_router(state)?;

    let addr = config.common.socket_addr();

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

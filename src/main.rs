//! bulk-dispatch server.
//!
//! Environment:
//!
//!   BULK_DISPATCH__SERVER__PORT           HTTP port (default 3000)
//!   BULK_DISPATCH__MESSAGING__BOT_NAME    sender name in message bodies
//!   BULK_DISPATCH__MESSAGING__DEMO_MODE   run without a real session
//!   BULK_DISPATCH__GATEWAY__URL           session gateway base URL
//!   RUST_LOG                              log filter, overrides server.log_level
//!
//! Runs until interrupted with Ctrl+C.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use bulk_dispatch::adapters::http::{app_router, RateLimiterState};
use bulk_dispatch::adapters::{
    DisabledConnector, GatewayConnector, InMemoryRateLimiter, SvgQrRenderer,
};
use bulk_dispatch::application::{BroadcastHub, SessionManager};
use bulk_dispatch::config::{AppConfig, ValidationError};
use bulk_dispatch::ports::SessionConnector;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    config.validate()?;
    let addr = config.server.socket_addr()?;

    let connector: Arc<dyn SessionConnector> = if config.is_demo() {
        Arc::new(DisabledConnector)
    } else {
        let gateway = config
            .gateway
            .client_config()
            .ok_or(ValidationError::MissingRequired("gateway.url"))?;
        tracing::info!(url = %gateway.base_url, "Using session gateway");
        Arc::new(GatewayConnector::new(gateway)?)
    };

    let hub = Arc::new(BroadcastHub::with_default_capacity(config.is_demo()));
    let session = SessionManager::spawn(
        config.messaging.session_settings(),
        connector,
        Arc::new(SvgQrRenderer::default()),
        hub,
    );

    let limiter = Arc::new(InMemoryRateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window(),
    ));
    if config.rate_limit.trust_proxy {
        tracing::info!("Rate limiting on forwarded client addresses");
    }
    let app = app_router(
        session.clone(),
        RateLimiterState::new(limiter).trusting_proxy(config.rate_limit.trust_proxy),
        &config.server.static_dir,
        &config.server.cors_origins_list(),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        demo_mode = config.is_demo(),
        bot_name = %config.messaging.bot_name,
        "Server running on http://localhost:{}",
        config.server.port
    );

    if let Err(e) = session.connect().await {
        tracing::warn!(error = %e, "Initial connect not started");
    }

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    session.shutdown().await;
    tracing::info!("Server closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}

use std::net::SocketAddr;
use std::sync::Arc;

use bilio_api::app::{self, AppServices};
use bilio_api::config::AppConfig;

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };

    bilio_observability::init(&config.log);

    if config.is_development() && std::env::var("JWT_SECRET").is_err() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let services = match AppServices::from_config(&config).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!(error = %e, "failed to initialise services");
            std::process::exit(1);
        }
    };

    let app = app::build_app(services, &config.jwt_secret, config.request_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, env = %config.env, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }
    tracing::info!("shut down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

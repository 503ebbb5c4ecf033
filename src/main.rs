use std::sync::Arc;

use anyhow::Context;
use roomgate::{
    AppState,
    acs::AcsHttp,
    config::Config,
    identity::AcsIdentityClient,
    membership::Membership,
    registry::AcsRoomsClient,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("roomgate=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let http = AcsHttp::new(config.connection, config.upstream)?;

    let membership = Membership::new(
        Arc::new(AcsIdentityClient::new(http.clone())),
        Arc::new(AcsRoomsClient::new(http)),
    );

    let app = roomgate::router(AppState { membership })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

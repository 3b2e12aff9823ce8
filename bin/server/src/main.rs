use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vantage_platform_access::{MemoryStore, Organization, RoleName};
use vantage_server::{app, build_state, config::ServerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(auth_enabled = config.auth.enabled, "Loaded configuration");

    // Development store; production deployments provide their own DataStore
    let store = Arc::new(MemoryStore::new(Organization::new(
        "default",
        "Default",
        RoleName::Member,
    )));

    let state = build_state(&config, store).expect("failed to build auth state");

    // Rotate the superadmin challenge until shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let rotation = tokio::spawn(Arc::clone(&state.challenge).run_rotation(
        state.nonce_expiration,
        async move {
            let mut shutdown_rx = shutdown_rx;
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
        },
    ));

    let app = app(state, Vec::new());

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    })
    .await
    .expect("server error");

    let _ = shutdown_tx.send(true);
    let _ = rotation.await;
}

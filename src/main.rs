use api_rest::{AppState, LoggingRelay, ServerConfig};
use gpupdate_core::{Composer, CoreConfig, EnvValues};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the GP update-record service.
///
/// Resolves configuration once, then serves the REST API until SIGINT or SIGTERM.
///
/// # Environment Variables
/// - `GPUPDATE_ADDR`: listen address (default: "0.0.0.0:8084")
/// - `SENDER_MESH_MAILBOX_ID`: mailbox written to `MessageHeader.source.endpoint`
/// - `DEFAULT_SENDER_ODS`: fallback organisation ODS code (default: "A(*)")
/// - `DEFAULT_BUSINESS_ACK_REQUESTED`, `DEFAULT_INFRASTRUCTURE_ACK_REQUESTED`: ack flags (default: true)
/// - `DEFAULT_RECIPIENT_TYPE`: "FI" or "FA" (default: "FI")
/// - `MAX_BODY_BYTES`: request body cap (default: 5 MiB)
/// - `REQUEST_TIMEOUT_SECS`: per-request timeout (default: 15)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gpupdate=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = |name: &str| std::env::var(name).ok();

    let core_config = CoreConfig::from_env_values(EnvValues {
        sender_mesh_mailbox: env("SENDER_MESH_MAILBOX_ID"),
        default_sender_ods: env("DEFAULT_SENDER_ODS"),
        default_business_ack_requested: env("DEFAULT_BUSINESS_ACK_REQUESTED"),
        default_infrastructure_ack_requested: env("DEFAULT_INFRASTRUCTURE_ACK_REQUESTED"),
        default_recipient_type: env("DEFAULT_RECIPIENT_TYPE"),
    })?;
    let server_config = ServerConfig::from_env_values(
        env("GPUPDATE_ADDR"),
        env("MAX_BODY_BYTES"),
        env("REQUEST_TIMEOUT_SECS"),
    )?;

    let relay = Arc::new(LoggingRelay::new(core_config.sender_mesh_mailbox()));
    let state = AppState::new(Composer::new(core_config), relay);
    let app = api_rest::router(state, &server_config);

    let listener = tokio::net::TcpListener::bind(server_config.addr()).await?;
    tracing::info!(
        addr = %server_config.addr(),
        max_body_bytes = server_config.max_body_bytes(),
        "REST server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

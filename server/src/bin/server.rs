use lansia_core::create_service;
use lansia_server::{start_server, telemetry, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let config = ServerConfig::load();
    tracing::info!(
        target: "server",
        backend = %config.backend,
        default_language = %config.default_language,
        "Starting Lansia TTS server"
    );

    let service = create_service(config.backend_kind());

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "server", error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!(target: "server", "Shutdown signal received");
    };

    start_server(config, service, shutdown).await?;
    Ok(())
}

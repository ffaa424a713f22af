use clap::Parser;
use pwned_server::{ServeError, ServerArgs, ServerConfig, run, telemetry};

#[tokio::main]
async fn main() -> Result<(), ServeError> {
    let config = ServerConfig::from(ServerArgs::parse());
    let log_guard = telemetry::init(config.log_level);

    run(config, shutdown_signal(), move || drop(log_guard)).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

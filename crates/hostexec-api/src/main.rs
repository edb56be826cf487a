//! hostexec API server entry point.

use hostexec_api::{http, AppState, HostexecConfig};
use hostexec_runtime::DockerProvider;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("hostexec_api=info".parse()?)
                .add_directive("hostexec_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting hostexec API server");

    let config = HostexecConfig::from_env()?;
    tracing::info!(?config, "Configuration loaded");
    config.validate_warn();

    let provider = Arc::new(DockerProvider::new(config.request_timeout_secs));
    let executor = config.build_executor(provider)?;
    let state = AppState::new(Arc::new(executor), config.max_script_bytes);

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Received shutdown signal");
    };

    http::serve(state, config.http_addr, shutdown).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

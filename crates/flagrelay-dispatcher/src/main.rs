use flagrelay_dispatcher::server::router;
use flagrelay_dispatcher::shared::config::DispatcherConfig;
use flagrelay_dispatcher::FlagRelay;
use flagrelay_providers::builtin_registry;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("flagrelay_dispatcher=info,info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = DispatcherConfig::from_env()?;
    info!(
        listen_addr = %config.listen_addr,
        public_url = %config.public_url,
        delivery_timeout_ms = config.delivery_timeout.as_millis() as u64,
        max_retries = config.retry_policy.max_retries,
        "Starting FlagRelay dispatcher"
    );

    let registry = builtin_registry(&config.provider_settings())?;
    info!(providers = registry.len(), "Addon providers installed");

    let listen_addr = config.listen_addr;
    let relay = Arc::new(FlagRelay::new(config, registry)?);
    let _listener = relay.start();
    relay.bootstrap().await?;

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(%listen_addr, "HTTP surface listening");
    axum::serve(listener, router(relay)).await?;

    Ok(())
}

use anyhow::Result;
use postapi::config::ApiConfig;
use postapi::server::ServerBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (RUST_LOG, defaulting to info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = ApiConfig::load()?;
    let addr = config.server_addr.clone();

    tracing::info!(
        resources = config.resources.len(),
        base_url = %config.base_url,
        "starting postapi"
    );

    ServerBuilder::new().with_config(config).serve(&addr).await
}

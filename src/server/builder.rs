//! ServerBuilder for fluent API to build HTTP servers

use super::exposure::RestExposure;
use super::host::ServerHost;
use crate::config::ApiConfig;
use crate::core::auth::{AuthProvider, StaticTokenAuthProvider};
use crate::core::service::{EntityStore, FileStorage};
use crate::storage::{InMemoryEntityStore, InMemoryFileStorage};
use anyhow::Result;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder wiring configuration and collaborators into a server
///
/// Every collaborator is optional: resources without a registered store get
/// an [`InMemoryEntityStore`], file storage defaults to
/// [`InMemoryFileStorage`], and identity defaults to a
/// [`StaticTokenAuthProvider`] loaded with the configured tokens.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(ApiConfig::from_yaml_file("postapi.yaml")?)
///     .with_store("post", InMemoryEntityStore::new("post"))
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: Option<ApiConfig>,
    stores: HashMap<String, Arc<dyn EntityStore>>,
    file_storage: Option<Arc<dyn FileStorage>>,
    auth_provider: Option<Arc<dyn AuthProvider>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: None,
            stores: HashMap::new(),
            file_storage: None,
            auth_provider: None,
            custom_routes: Vec::new(),
        }
    }

    /// Set the configuration (defaults to [`ApiConfig::default_config`])
    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the store of a resource, keyed by singular name
    pub fn with_store(mut self, entity_type: &str, store: impl EntityStore + 'static) -> Self {
        self.stores.insert(entity_type.to_string(), Arc::new(store));
        self
    }

    pub fn with_file_storage(mut self, storage: impl FileStorage + 'static) -> Self {
        self.file_storage = Some(Arc::new(storage));
        self
    }

    pub fn with_auth_provider(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Some(Arc::new(provider));
        self
    }

    /// Add custom routes to the server
    ///
    /// Use this for routes outside the resource pattern, such as login
    /// endpoints served by the identity collaborator.
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Build the transport-agnostic host
    pub fn build_host(mut self) -> Result<ServerHost> {
        let config = self.config.take().unwrap_or_else(ApiConfig::default_config);

        let mut stores = std::mem::take(&mut self.stores);
        for resource in &config.resources {
            stores
                .entry(resource.singular.clone())
                .or_insert_with(|| -> Arc<dyn EntityStore> {
                    Arc::new(InMemoryEntityStore::new(resource.singular.clone()))
                });
        }

        let files = self.file_storage.take().unwrap_or_else(|| -> Arc<dyn FileStorage> {
            Arc::new(InMemoryFileStorage::new(format!(
                "{}/uploads",
                config.base_url.trim_end_matches('/')
            )))
        });

        let auth = self
            .auth_provider
            .take()
            .unwrap_or_else(|| -> Arc<dyn AuthProvider> { Arc::new(token_provider(&config)) });

        ServerHost::from_builder_components(config, stores, files, auth)
    }

    /// Build the final REST router
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        RestExposure::build_router(host, custom_routes)
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn token_provider(config: &ApiConfig) -> StaticTokenAuthProvider {
    let provider = StaticTokenAuthProvider::new();
    for token in &config.tokens {
        provider.insert(&token.token, token.context());
    }
    provider
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

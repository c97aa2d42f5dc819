//! REST API exposure
//!
//! The REST exposure consumes a `ServerHost` and produces an Axum `Router`
//! with one route group per configured resource.

pub mod handlers;
pub mod payload;

use super::super::host::ServerHost;
use crate::server::entity_registry::ResourceHandle;
use anyhow::Result;
use axum::{
    Json, Router,
    routing::{get, put},
};
use handlers::{LikeState, ResourceState};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Build the REST router from a host
    ///
    /// Returns a router with:
    /// - Health check routes
    /// - CRUD routes for every resource
    /// - Like routes for resources with `likes` enabled
    /// - Custom routes
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let mut app = Self::health_routes();

        for resource in host.registry.iter() {
            app = app.merge(Self::resource_routes(host.clone(), resource.clone()));
        }

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Ok(app.layer(TraceLayer::new_for_http()).layer(cors))
    }

    /// Routes of one resource, bound to its own state
    fn resource_routes(host: Arc<ServerHost>, resource: Arc<ResourceHandle>) -> Router {
        let collection = format!("/{}", resource.plural());
        let item = format!("{}/{{id}}", collection);

        let router = Router::new()
            .route(
                &collection,
                get(handlers::list_entities).post(handlers::create_entity),
            )
            .route(
                &item,
                get(handlers::get_entity)
                    .put(handlers::update_entity)
                    .delete(handlers::delete_entity),
            );

        tracing::debug!(resource = resource.entity_type(), route = %collection, "mounted");
        let state = ResourceState { host, resource };

        match state.resource.likes.clone() {
            Some(likes) => {
                let like = Router::new()
                    .route(
                        &format!("{}/like/{{user_id}}", item),
                        put(handlers::toggle_like),
                    )
                    .with_state(LikeState {
                        resource: state.clone(),
                        likes,
                    });
                router.with_state(state).merge(like)
            }
            None => router.with_state(state),
        }
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "postapi"
        }))
    }
}

use std::sync::Arc;

use aleph_node::AlephNode;
use aleph_protocol::routes;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all admin endpoints.
pub fn build_router(node: Arc<AlephNode>) -> Router {
    Router::new()
        .route(routes::HEALTH, get(handler::health_handler))
        .route(routes::ID, get(handler::id_handler))
        .route(routes::PING, get(handler::ping_handler))
        .route(routes::PUBLISH, post(handler::publish_handler))
        .route(routes::STATEMENT, get(handler::statement_handler))
        .route(routes::DATA, post(handler::put_data_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(node))
}

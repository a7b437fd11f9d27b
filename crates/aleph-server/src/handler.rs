use std::sync::Arc;

use aleph_node::AlephNode;
use aleph_protocol::{HealthResponse, PingResponse};
use aleph_types::{ContentId, PeerId, SimpleStatement, Statement, StatementId};
use axum::extract::{Path, State};
use axum::response::Json;
use tracing::info;

use crate::error::{ServerError, ServerResult};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<AlephNode>,
}

impl AppState {
    pub fn new(node: Arc<AlephNode>) -> Self {
        Self { node }
    }
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// The node's peer id as plain text.
pub async fn id_handler(State(state): State<AppState>) -> String {
    state.node.id().to_string()
}

/// Liveness check of a peer from the node's directory.
pub async fn ping_handler(
    State(state): State<AppState>,
    Path(peer_id): Path<String>,
) -> ServerResult<Json<PingResponse>> {
    let peer_id = PeerId::from(peer_id);
    let rtt = state.node.ping(&peer_id).await?;
    Ok(Json(PingResponse {
        peer_id,
        rtt_ms: rtt.as_millis() as u64,
    }))
}

/// Publish a statement body under a namespace. Answers with the assigned
/// statement id as plain text.
pub async fn publish_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    Json(body): Json<SimpleStatement>,
) -> ServerResult<String> {
    let id = state.node.publish(&namespace, body).await?;
    info!(id = %id, namespace = %namespace, "published via admin API");
    Ok(id.into_string())
}

/// A stored statement as JSON.
pub async fn statement_handler(
    State(state): State<AppState>,
    Path(statement_id): Path<String>,
) -> ServerResult<Json<Statement>> {
    let statement = state.node.statement(&StatementId::from(statement_id)).await?;
    Ok(Json(statement))
}

/// Store each JSON value of the request array as a data object. Answers
/// with their content ids in request order.
pub async fn put_data_handler(
    State(state): State<AppState>,
    Json(objects): Json<Vec<serde_json::Value>>,
) -> ServerResult<Json<Vec<ContentId>>> {
    let mut ids = Vec::with_capacity(objects.len());
    for object in &objects {
        let bytes = serde_json::to_vec(object).map_err(|e| ServerError::BadRequest(e.to_string()))?;
        ids.push(state.node.put_data(bytes)?);
    }
    info!(count = ids.len(), "data objects stored via admin API");
    Ok(Json(ids))
}

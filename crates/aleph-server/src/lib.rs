//! Administrative HTTP surface of an aleph peer node.
//!
//! Routes:
//!
//! - `GET /id` -- the node's peer id as plain text
//! - `GET /ping/{peerId}` -- liveness check of a peer from the node's directory
//! - `POST /publish/{namespace}` -- publish a JSON statement body; answers the new id
//! - `GET /stmt/{statementId}` -- a stored statement as JSON
//! - `POST /data` -- store a JSON array of data objects; answers their content ids
//! - `GET /health` -- health check

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ErrorResponse, ServerError, ServerResult};
pub use handler::AppState;
pub use router::build_router;
pub use server::AdminServer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use aleph_node::{AlephNode, NodeConfig};
    use aleph_protocol::{HealthResponse, PingResponse};
    use aleph_types::{ContentId, SimpleStatement, Statement, StatementBody};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use tower::util::ServiceExt;

    fn node() -> Arc<AlephNode> {
        Arc::new(AlephNode::new(NodeConfig::ephemeral()).unwrap())
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn post_json(app: Router, uri: &str, json: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = get(build_router(node()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
    }

    #[tokio::test]
    async fn id_endpoint_returns_plain_peer_id() {
        let node = node();
        let (status, body) = get(build_router(Arc::clone(&node)), "/id").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(body).unwrap(), node.id().as_str());
    }

    #[tokio::test]
    async fn publish_then_fetch_statement() {
        let node = node();
        let app = build_router(Arc::clone(&node));

        let (status, body) = post_json(
            app.clone(),
            "/publish/scratch.test",
            r#"{"object":"QmF00123456789","refs":["foo:bar123"],"tags":["test"]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = String::from_utf8(body).unwrap();
        assert!(id.starts_with(node.id().as_str()));

        let (status, body) = get(app, &format!("/stmt/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        let statement: Statement = serde_json::from_slice(&body).unwrap();
        assert_eq!(statement.id.as_str(), id);
        assert_eq!(statement.namespace, "scratch.test");
        assert_eq!(
            statement.body,
            StatementBody::from(
                SimpleStatement::new("QmF00123456789")
                    .with_ref("foo:bar123")
                    .with_tag("test")
            )
        );
        node.verify_statement(&statement).unwrap();
    }

    #[tokio::test]
    async fn publish_rejects_wildcard_namespace() {
        let (status, _) = post_json(
            build_router(node()),
            "/publish/scratch.*",
            r#"{"object":"QmF00123456789"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn publish_rejects_malformed_body() {
        let (status, _) = post_json(build_router(node()), "/publish/scratch.test", "{").await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn missing_statement_is_404() {
        let (status, body) = get(build_router(node()), "/stmt/QmF001234:foo:5678").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn ping_statuses() {
        let remote = node();
        let remote_addr = remote.start().await.unwrap();

        let local = node();
        let app = build_router(Arc::clone(&local));

        let (status, _) = get(app.clone(), &format!("/ping/{}", remote.id())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        local.add_peer(remote.id().clone(), remote_addr).unwrap();
        let (status, body) = get(app.clone(), &format!("/ping/{}", remote.id())).await;
        assert_eq!(status, StatusCode::OK);
        let pong: PingResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(&pong.peer_id, remote.id());

        remote.shutdown().await.unwrap();
        let (status, _) = get(app, &format!("/ping/{}", remote.id())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn put_data_stores_objects_in_order() {
        let node = node();
        let (status, body) = post_json(
            build_router(Arc::clone(&node)),
            "/data",
            r#"[{"foo":"bar"},{"hello":"world"}]"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<ContentId> = serde_json::from_slice(&body).unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);

        let stored = node.data(&ids[0]).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(value, serde_json::json!({"foo": "bar"}));
        let stored = node.data(&ids[1]).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(value, serde_json::json!({"hello": "world"}));
    }

    #[tokio::test]
    async fn put_data_rejects_non_array_body() {
        let (status, _) = post_json(build_router(node()), "/data", r#"{"foo":"bar"}"#).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, _) = get(build_router(node()), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use aleph_node::AlephNode;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Administrative HTTP server of one node.
pub struct AdminServer {
    config: ServerConfig,
    node: Arc<AlephNode>,
}

impl AdminServer {
    pub fn new(config: ServerConfig, node: Arc<AlephNode>) -> Self {
        Self { config, node }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.node))
    }

    /// Bind the listener. Split from serving so callers can learn the bound
    /// address when binding port 0.
    pub async fn bind(&self) -> ServerResult<TcpListener> {
        Ok(TcpListener::bind(self.config.bind_addr).await?)
    }

    /// Serve requests on `listener` until `shutdown` completes.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: Option<SocketAddr> = listener.local_addr().ok();
        tracing::info!(?addr, peer_id = %self.node.id(), "admin server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }

    /// Start serving requests until the task is dropped.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = self.bind().await?;
        self.serve_with_shutdown(listener, std::future::pending()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aleph_node::NodeConfig;

    #[test]
    fn server_construction() {
        let node = Arc::new(AlephNode::new(NodeConfig::ephemeral()).unwrap());
        let server = AdminServer::new(ServerConfig::default(), node);
        assert_eq!(server.config().bind_addr, "127.0.0.1:9001".parse().unwrap());
        let _router = server.router();
    }
}

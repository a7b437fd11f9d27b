use aleph_node::NodeError;
use aleph_store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Node(NodeError::StatementNotFound(_)) | Self::Node(NodeError::UnknownPeer(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Node(NodeError::Invalid(_))
            | Self::Node(NodeError::Store(StoreError::Malformed(_)))
            | Self::Node(NodeError::Store(StoreError::InvalidId(_)))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Node(NodeError::Fetch(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::BAD_REQUEST => "BAD_REQUEST",
            StatusCode::BAD_GATEWAY => "PEER_UNREACHABLE",
            _ => "INTERNAL_ERROR",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "admin request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use aleph_types::{PeerId, StatementId, TypeError};

    #[test]
    fn status_codes() {
        let not_found = ServerError::from(NodeError::StatementNotFound(StatementId::from("x")));
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let unknown = ServerError::from(NodeError::UnknownPeer(PeerId::from("p")));
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        let invalid = ServerError::from(NodeError::Invalid(TypeError::MissingField("namespace")));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let internal = ServerError::Internal("boom".into());
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! Administrative HTTP surface paths.
//!
//! `endpoints` holds the fixed path prefixes; `routes` holds the same paths
//! with their parameter placeholders, in the router's syntax.

pub mod endpoints {
    pub const ID: &str = "/id";
    pub const PING: &str = "/ping";
    pub const PUBLISH: &str = "/publish";
    pub const STATEMENT: &str = "/stmt";
    pub const DATA: &str = "/data";
    pub const HEALTH: &str = "/health";
}

pub mod routes {
    pub const ID: &str = "/id";
    pub const PING: &str = "/ping/:peer_id";
    pub const PUBLISH: &str = "/publish/:namespace";
    pub const STATEMENT: &str = "/stmt/:statement_id";
    pub const DATA: &str = "/data";
    pub const HEALTH: &str = "/health";
}

/// Health check response.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: super::message::PROTOCOL_VERSION,
        }
    }
}

/// Successful ping answer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PingResponse {
    pub peer_id: aleph_types::PeerId,
    /// Round-trip time of the ping exchange in milliseconds.
    pub rtt_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_defaults() {
        let h = HealthResponse::default();
        assert_eq!(h.status, "ok");
        assert_eq!(h.protocol_version, 1);
    }

    #[test]
    fn routes_extend_endpoints() {
        for (prefix, route) in [
            (endpoints::PING, routes::PING),
            (endpoints::PUBLISH, routes::PUBLISH),
            (endpoints::STATEMENT, routes::STATEMENT),
        ] {
            assert!(route.starts_with(&format!("{prefix}/:")));
        }
        assert_eq!(endpoints::ID, routes::ID);
        assert_eq!(endpoints::DATA, routes::DATA);
        assert_eq!(endpoints::HEALTH, routes::HEALTH);
    }
}

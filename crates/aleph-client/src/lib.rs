//! REST client for the administrative HTTP surface of an aleph node.
//!
//! ```no_run
//! # async fn demo() -> aleph_client::ClientResult<()> {
//! use aleph_client::{ClientConfig, RestClient};
//!
//! let client = RestClient::new(&ClientConfig::new("http://127.0.0.1:9001"))?;
//! let peer_id = client.id().await?;
//! println!("connected to {peer_id}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::RestClient;
pub use config::{ClientConfig, DEFAULT_PEER_URL, DEFAULT_TIMEOUT};
pub use error::{ClientError, ClientResult};

//! Remote data fetch between aleph peers.
//!
//! A peer asks another peer for data objects by content id. The request is
//! an ordered id list; the answer is an ordered list of `(key, value)`
//! results of the same length, where a missing object is an explicit
//! [`DataValue::Missing`] slot rather than an omission.
//!
//! - [`RemoteFetchClient`] -- sends requests and verifies the answers
//! - [`RemoteFetchServer`] -- answers requests from a local [`aleph_store::DataStore`]
//! - [`Connector`] -- the connection primitive; [`TcpConnector`] by default
//!
//! Failures split into connection faults (retryable, no results produced)
//! and protocol faults (the peer broke the ordering or key contract). See
//! [`FetchError`].

pub mod client;
pub mod error;
pub mod server;
pub mod transport;
pub mod types;
pub mod verifier;

pub use client::{FetchConnection, RemoteFetchClient};
pub use error::{FetchError, Result};
pub use server::{serve_connection, RemoteFetchServer};
pub use transport::{Connector, TcpConnector};
pub use types::{DataValue, FetchResult, PeerHandle};
pub use verifier::ResponseVerifier;

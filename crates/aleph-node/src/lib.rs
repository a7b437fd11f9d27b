//! The aleph peer node.
//!
//! [`AlephNode`] ties together what a peer runs: its Ed25519 identity, the
//! indexed statement store, the local data object store, a remote fetch
//! server that answers other peers, and a static directory of known peers.
//! It is the backing of the administrative HTTP surface.
//!
//! Configuration is explicit: every node is built from a [`NodeConfig`]
//! passed at construction.

pub mod config;
pub mod error;
pub mod keys;
pub mod node;

pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use node::AlephNode;

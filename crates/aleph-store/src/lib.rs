//! Local storage for aleph peers.
//!
//! This crate holds the two stores a peer keeps: the indexed statement
//! database and the content-id keyed data object store that the remote fetch
//! server answers from. Data objects live in memory ([`InMemoryDataStore`])
//! or one file each under a directory ([`DirDataStore`]).
//!
//! # Statement Store
//!
//! [`StatementDb`] implements [`StatementStore`] with three lookup paths:
//!
//! - by statement id
//! - by WKI (well-known identifier) through the statements' `refs`
//! - by namespace pattern (`*`, `prefix.*`, or exact)
//!
//! Durable state is a single append-only [`StatementLog`]; the indices live
//! in memory and are rebuilt from the log when the store opens.
//!
//! # Design Rules
//!
//! 1. `put` is an upsert. The primary record and both indices change in one
//!    step; readers see either the old state or the new one.
//! 2. Results come back in arrival order. An overwrite keeps the original
//!    position.
//! 3. Malformed statements are rejected before anything is written.
//! 4. The store never verifies signatures and never interprets data payloads.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod data;
pub mod db;
pub mod error;
pub mod index;
pub mod log;
pub mod namespace;
pub mod traits;

pub use config::{StoreConfig, SyncMode};
pub use data::{DataStore, DirDataStore, InMemoryDataStore};
pub use db::{DbHandle, StatementDb};
pub use error::{StoreError, StoreResult};
pub use index::{StatementIndex, Upsert};
pub use log::{LogRecord, StatementLog};
pub use namespace::{matches, NamespacePattern};
pub use traits::StatementStore;

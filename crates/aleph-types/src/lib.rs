//! Foundation types for aleph peers.
//!
//! Every other aleph crate depends on `aleph-types`. The statement model is
//! deliberately closed: [`StatementBody`] is a sum type whose only current
//! variant is [`SimpleStatement`], and new body kinds are added as variants.
//!
//! # Key Types
//!
//! - [`Statement`] -- a signed, namespaced assertion about a data object
//! - [`StatementId`] -- `<publisherRoot>:<publisher>:<sequence>` primary key
//! - [`ContentId`] -- opaque identifier of a data object's bytes
//! - [`PeerId`] -- identifier of a peer node

pub mod error;
pub mod id;
pub mod namespace;
pub mod statement;

pub use error::TypeError;
pub use id::{ContentId, PeerId, StatementId};
pub use namespace::validate_namespace;
pub use statement::{SimpleStatement, Statement, StatementBody, StatementDraft};

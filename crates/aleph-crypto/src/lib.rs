//! Cryptographic primitives for aleph peers.
//!
//! Provides domain-separated BLAKE3 content ids for data objects, Ed25519
//! peer keys, and signing/verification of statements.
//!
//! All crypto operations wrap established libraries -- no custom cryptography.

pub mod hasher;
pub mod signer;
pub mod statement;

pub use hasher::ContentHasher;
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
pub use statement::{sign_statement, signing_payload, verify_statement};

//! Statement signatures.
//!
//! The signed message covers every field except the signature itself, so a
//! statement cannot be moved to another id, namespace, or publisher without
//! invalidating it.

use aleph_types::{Statement, StatementBody, StatementDraft, StatementId};
use serde::Serialize;

use crate::signer::{Signature, SignatureError, SigningKey, VerifyingKey};

#[derive(Serialize)]
struct SigningPayload<'a> {
    id: &'a StatementId,
    publisher: &'a str,
    namespace: &'a str,
    body: &'a StatementBody,
    timestamp: i64,
}

/// Bytes a statement's signature is computed over.
pub fn signing_payload(statement: &Statement) -> Result<Vec<u8>, SignatureError> {
    encode(&SigningPayload {
        id: &statement.id,
        publisher: &statement.publisher,
        namespace: &statement.namespace,
        body: &statement.body,
        timestamp: statement.timestamp,
    })
}

fn encode(payload: &SigningPayload<'_>) -> Result<Vec<u8>, SignatureError> {
    serde_json::to_vec(payload).map_err(|e| SignatureError::Serialization(e.to_string()))
}

/// Assign `id` to a draft and sign it.
pub fn sign_statement(
    key: &SigningKey,
    draft: StatementDraft,
    id: StatementId,
) -> Result<Statement, SignatureError> {
    let payload = encode(&SigningPayload {
        id: &id,
        publisher: &draft.publisher,
        namespace: &draft.namespace,
        body: &draft.body,
        timestamp: draft.timestamp,
    })?;
    let signature = key.sign(&payload);
    Ok(draft.into_statement(id, signature.to_bytes().to_vec()))
}

/// Check a statement's signature against a publisher key.
pub fn verify_statement(key: &VerifyingKey, statement: &Statement) -> Result<(), SignatureError> {
    let signature = Signature::from_slice(&statement.signature)?;
    key.verify(&signing_payload(statement)?, &signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aleph_types::SimpleStatement;

    fn draft() -> StatementDraft {
        StatementDraft {
            publisher: "foo".into(),
            namespace: "scratch.test".into(),
            body: SimpleStatement::new("Qm1").with_ref("foo:bar123").into(),
            timestamp: 1234,
        }
    }

    #[test]
    fn signed_statement_verifies() {
        let key = SigningKey::generate();
        let stmt = sign_statement(&key, draft(), StatementId::from("r:foo:0")).unwrap();
        assert_eq!(stmt.signature.len(), 64);
        assert!(verify_statement(&key.verifying_key(), &stmt).is_ok());
    }

    #[test]
    fn tampered_namespace_fails() {
        let key = SigningKey::generate();
        let mut stmt = sign_statement(&key, draft(), StatementId::from("r:foo:0")).unwrap();
        stmt.namespace = "scratch.other".into();
        assert_eq!(
            verify_statement(&key.verifying_key(), &stmt),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn moved_id_fails() {
        let key = SigningKey::generate();
        let mut stmt = sign_statement(&key, draft(), StatementId::from("r:foo:0")).unwrap();
        stmt.id = StatementId::from("r:foo:1");
        assert!(verify_statement(&key.verifying_key(), &stmt).is_err());
    }

    #[test]
    fn empty_signature_rejected() {
        let key = SigningKey::generate();
        let mut stmt = sign_statement(&key, draft(), StatementId::from("r:foo:0")).unwrap();
        stmt.signature.clear();
        assert_eq!(
            verify_statement(&key.verifying_key(), &stmt),
            Err(SignatureError::InvalidSignature)
        );
    }
}

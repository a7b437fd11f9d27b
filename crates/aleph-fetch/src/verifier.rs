use aleph_types::ContentId;

use crate::error::{FetchError, Result};
use crate::types::FetchResult;

/// Checks a data response against the request it answers.
pub struct ResponseVerifier;

impl ResponseVerifier {
    /// Require exactly one result per requested id, each keyed by the id
    /// requested at the same position.
    pub fn verify(requested: &[ContentId], results: &[FetchResult]) -> Result<()> {
        if requested.len() != results.len() {
            return Err(FetchError::CountMismatch {
                expected: requested.len(),
                actual: results.len(),
            });
        }

        for (position, (expected, result)) in requested.iter().zip(results).enumerate() {
            if &result.key != expected {
                return Err(FetchError::KeyMismatch {
                    position,
                    expected: expected.clone(),
                    actual: result.key.clone(),
                });
            }
        }
        Ok(())
    }
}

//! Namespace validation for publishing.
//!
//! Namespaces are dot-delimited topic strings such as `scratch.test`. Query
//! patterns are matched by the store; this module only decides which
//! strings a publisher may attach to a new statement.

use crate::error::TypeError;

/// Segment separator.
pub const SEPARATOR: char = '.';

/// Wildcard token reserved for query patterns.
pub const WILDCARD: &str = "*";

/// Check that `namespace` is a concrete (non-pattern) namespace.
pub fn validate_namespace(namespace: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidNamespace {
        namespace: namespace.to_string(),
        reason: reason.to_string(),
    };

    if namespace.is_empty() {
        return Err(invalid("empty"));
    }
    if namespace.contains(WILDCARD) {
        return Err(invalid("wildcards are only valid in queries"));
    }
    if namespace.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid("contains whitespace or '/'"));
    }
    if namespace.split(SEPARATOR).any(str::is_empty) {
        return Err(invalid("empty segment"));
    }
    Ok(())
}

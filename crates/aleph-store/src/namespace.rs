//! Namespace pattern matching.
//!
//! Three pattern forms exist:
//!
//! - `*` matches every namespace.
//! - `prefix.*` matches every namespace starting with `prefix.` (the dot is
//!   part of the prefix, so `scratch.*` does not match `scratch` or
//!   `scratchy.test`).
//! - anything else matches only itself.
//!
//! There are no mid-string wildcards. A malformed pattern is simply taken
//! literally.

/// A parsed namespace query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamespacePattern<'a> {
    Any,
    /// Literal prefix including its trailing separator.
    Prefix(&'a str),
    Exact(&'a str),
}

impl<'a> NamespacePattern<'a> {
    pub fn parse(pattern: &'a str) -> Self {
        if pattern == "*" {
            return Self::Any;
        }
        match pattern.strip_suffix('*') {
            Some(prefix) if prefix.ends_with('.') => Self::Prefix(prefix),
            _ => Self::Exact(pattern),
        }
    }

    pub fn matches(&self, namespace: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => namespace.starts_with(prefix),
            Self::Exact(exact) => namespace == *exact,
        }
    }
}

/// Whether `namespace` matches `pattern`.
pub fn matches(namespace: &str, pattern: &str) -> bool {
    NamespacePattern::parse(pattern).matches(namespace)
}

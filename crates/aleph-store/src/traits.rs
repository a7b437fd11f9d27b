use aleph_types::{Statement, StatementId};
use async_trait::async_trait;

use crate::error::StoreResult;
use crate::index::Upsert;

/// Indexed statement storage.
///
/// All implementations must satisfy these invariants:
/// - `put` is an upsert keyed by statement id. The primary record and both
///   reverse indices change together; readers never observe one without the
///   others.
/// - Query results are ordered by first arrival of each id, never by
///   timestamp.
/// - Reads return exactly what was last put: no normalization, no
///   signature checks.
/// - A miss is `Ok(None)` or an empty vector, never an error.
#[async_trait]
pub trait StatementStore: Send + Sync {
    /// Validate and insert or replace a statement.
    async fn put(&self, statement: Statement) -> StoreResult<Upsert>;

    /// Read a statement by id.
    async fn get(&self, id: &StatementId) -> StoreResult<Option<Statement>>;

    /// Every statement whose refs include `wki`.
    async fn get_by_wki(&self, wki: &str) -> StoreResult<Vec<Statement>>;

    /// Every statement whose namespace matches `pattern` (`*`, `prefix.*`,
    /// or an exact namespace).
    async fn get_by_namespace(&self, pattern: &str) -> StoreResult<Vec<Statement>>;

    /// All stored statement ids in arrival order.
    async fn ids(&self) -> StoreResult<Vec<StatementId>>;

    /// Number of stored statements.
    async fn len(&self) -> StoreResult<usize>;

    /// Push buffered writes to durable storage.
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Read several statements; each slot is `None` when that id is absent.
    async fn get_many(&self, ids: &[StatementId]) -> StoreResult<Vec<Option<Statement>>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.get(id).await?);
        }
        Ok(out)
    }
}

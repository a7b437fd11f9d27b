//! The statement database: a statement log plus the in-memory index rebuilt
//! from it.

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

use aleph_types::{Statement, StatementId};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::index::{StatementIndex, Upsert};
use crate::log::{LogRecord, StatementLog};
use crate::traits::StatementStore;

/// An opened statement database.
///
/// Writers are serialized by `write_gate` so the log order and the index
/// order always agree. Readers only contend with the brief index update at
/// the end of each put.
pub struct DbHandle {
    log: Option<StatementLog>,
    write_gate: Mutex<()>,
    index: RwLock<StatementIndex>,
}

impl DbHandle {
    /// Open the backing log (if any) and rebuild the index from it.
    fn load(config: &StoreConfig) -> StoreResult<Self> {
        let mut index = StatementIndex::new();

        let log = match &config.path {
            Some(path) => {
                let log = StatementLog::open(path, config.sync_mode)?;
                let recovered = log.recover()?;
                log.truncate_to(recovered.end_offset)?;
                for record in recovered.records {
                    match record {
                        LogRecord::Put(statement) => {
                            index.upsert(statement);
                        }
                    }
                }
                info!(
                    path = %path.display(),
                    statements = index.len(),
                    skipped = recovered.skipped,
                    "statement store opened"
                );
                Some(log)
            }
            None => {
                debug!("statement store opened in memory");
                None
            }
        };

        Ok(Self {
            log,
            write_gate: Mutex::new(()),
            index: RwLock::new(index),
        })
    }

    pub fn put(&self, statement: Statement) -> StoreResult<Upsert> {
        statement.validate()?;

        let _gate = self
            .write_gate
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("write gate: {e}")))?;

        let statement = match &self.log {
            Some(log) => {
                let record = LogRecord::Put(statement);
                log.append(&record)?;
                let LogRecord::Put(statement) = record;
                statement
            }
            None => statement,
        };

        let id = statement.id.clone();
        let outcome = self
            .index
            .write()
            .map_err(|e| StoreError::Poisoned(format!("index: {e}")))?
            .upsert(statement);
        debug!(id = %id, ?outcome, "statement put");
        Ok(outcome)
    }

    pub fn get(&self, id: &StatementId) -> StoreResult<Option<Statement>> {
        Ok(self.read_index()?.get(id).cloned())
    }

    pub fn by_wki(&self, wki: &str) -> StoreResult<Vec<Statement>> {
        Ok(self.read_index()?.by_wki(wki).into_iter().cloned().collect())
    }

    pub fn by_namespace(&self, pattern: &str) -> StoreResult<Vec<Statement>> {
        Ok(self
            .read_index()?
            .by_namespace(pattern)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn ids(&self) -> StoreResult<Vec<StatementId>> {
        Ok(self.read_index()?.iter().map(|s| s.id.clone()).collect())
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_index()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_index()?.is_empty())
    }

    /// Rewrite the log with one record per live statement.
    pub fn compact(&self) -> StoreResult<()> {
        let Some(log) = &self.log else {
            return Ok(());
        };
        let _gate = self
            .write_gate
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("write gate: {e}")))?;
        let records: Vec<LogRecord> = self
            .read_index()?
            .iter()
            .cloned()
            .map(LogRecord::Put)
            .collect();
        log.rewrite(&records)?;
        info!(statements = records.len(), "statement log compacted");
        Ok(())
    }

    fn sync(&self) -> StoreResult<()> {
        match &self.log {
            Some(log) => log.sync(),
            None => Ok(()),
        }
    }

    fn read_index(&self) -> StoreResult<RwLockReadGuard<'_, StatementIndex>> {
        self.index
            .read()
            .map_err(|e| StoreError::Poisoned(format!("index: {e}")))
    }
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHandle").field("log", &self.log).finish()
    }
}

/// Durable, indexed statement store.
///
/// The backing resources are acquired lazily by [`StatementDb::open`], which
/// is safe to race: concurrent callers share a single initialization and
/// all receive the same handle. A failed open releases whatever it had
/// acquired and leaves the store unopened, so a later call may retry.
/// Every other operation opens the store on first use.
#[derive(Debug)]
pub struct StatementDb {
    config: StoreConfig,
    handle: OnceCell<Arc<DbHandle>>,
}

impl StatementDb {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            handle: OnceCell::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(StoreConfig::in_memory())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.handle.initialized()
    }

    /// Acquire the backing storage, rebuilding indices from the log.
    pub async fn open(&self) -> StoreResult<Arc<DbHandle>> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                let config = self.config.clone();
                let handle = run_blocking(move || DbHandle::load(&config)).await?;
                Ok::<_, StoreError>(Arc::new(handle))
            })
            .await?;
        Ok(Arc::clone(handle))
    }

    /// Rewrite the backing log without superseded records.
    pub async fn compact(&self) -> StoreResult<()> {
        let handle = self.open().await?;
        run_blocking(move || handle.compact()).await
    }

    /// Flush and release the backing storage.
    pub async fn close(self) -> StoreResult<()> {
        self.flush().await
    }
}

#[async_trait]
impl StatementStore for StatementDb {
    async fn put(&self, statement: Statement) -> StoreResult<Upsert> {
        let handle = self.open().await?;
        run_blocking(move || handle.put(statement)).await
    }

    async fn get(&self, id: &StatementId) -> StoreResult<Option<Statement>> {
        self.open().await?.get(id)
    }

    async fn get_by_wki(&self, wki: &str) -> StoreResult<Vec<Statement>> {
        self.open().await?.by_wki(wki)
    }

    async fn get_by_namespace(&self, pattern: &str) -> StoreResult<Vec<Statement>> {
        self.open().await?.by_namespace(pattern)
    }

    async fn ids(&self) -> StoreResult<Vec<StatementId>> {
        self.open().await?.ids()
    }

    async fn len(&self) -> StoreResult<usize> {
        self.open().await?.len()
    }

    async fn flush(&self) -> StoreResult<()> {
        match self.handle.get() {
            Some(handle) => {
                let handle = Arc::clone(handle);
                run_blocking(move || handle.sync()).await
            }
            None => Ok(()),
        }
    }
}

async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use aleph_types::{SimpleStatement, TypeError};

    fn stmt(id: &str, namespace: &str, refs: &[&str]) -> Statement {
        let mut body = SimpleStatement::new("QmF00123456789").with_tag("test");
        body.refs = refs.iter().map(|r| r.to_string()).collect();
        Statement {
            id: StatementId::from(id),
            publisher: "foo".into(),
            namespace: namespace.into(),
            body: body.into(),
            timestamp: 1_500_000_000_000,
            signature: Vec::new(),
        }
    }

    fn seed() -> Vec<Statement> {
        vec![
            stmt("QmF001234:foo:5678", "scratch.test", &["foo:bar123"]),
            stmt("QmF001234:foo:6789", "scratch.blah", &["foo:bar456"]),
        ]
    }

    async fn seeded_db() -> StatementDb {
        let db = StatementDb::in_memory();
        db.open().await.unwrap();
        for s in seed() {
            db.put(s).await.unwrap();
        }
        db
    }

    // -----------------------------------------------------------------------
    // Queries over the seeded statements
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_by_id_roundtrips() {
        let db = seeded_db().await;
        for s in seed() {
            assert_eq!(db.get(&s.id).await.unwrap(), Some(s));
        }
        assert_eq!(db.get(&StatementId::from("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_by_wki() {
        let db = seeded_db().await;
        let results = db.get_by_wki("foo:bar123").await.unwrap();
        assert_eq!(results, vec![seed()[0].clone()]);
    }

    #[tokio::test]
    async fn get_by_namespace_exact_and_empty() {
        let db = seeded_db().await;
        assert_eq!(
            db.get_by_namespace("scratch.test").await.unwrap(),
            vec![seed()[0].clone()]
        );
        assert!(db.get_by_namespace("nothing.here").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_by_namespace_wildcards() {
        let db = seeded_db().await;
        assert_eq!(db.get_by_namespace("*").await.unwrap(), seed());
        assert_eq!(db.get_by_namespace("scratch.*").await.unwrap(), seed());
    }

    #[tokio::test]
    async fn get_many_marks_missing() {
        let db = seeded_db().await;
        let ids = vec![seed()[1].id.clone(), StatementId::from("nope")];
        let results = db.get_many(&ids).await.unwrap();
        assert_eq!(results, vec![Some(seed()[1].clone()), None]);
    }

    // -----------------------------------------------------------------------
    // Upsert and validation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_twice_is_idempotent() {
        let db = seeded_db().await;
        assert_eq!(db.put(seed()[0].clone()).await.unwrap(), Upsert::Replaced);
        assert_eq!(db.len().await.unwrap(), 2);
        assert_eq!(db.get_by_namespace("*").await.unwrap(), seed());
        assert_eq!(db.get_by_wki("foo:bar123").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_statement_rejected_without_mutation() {
        let db = seeded_db().await;
        let bad = stmt("QmF001234:foo:9999", "", &["foo:bar123"]);
        let err = db.put(bad).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed(TypeError::MissingField("namespace"))));
        assert!(!err.is_storage_fault());
        assert_eq!(db.len().await.unwrap(), 2);
        assert_eq!(db.get_by_wki("foo:bar123").await.unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Open semantics
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn open_is_shared_across_racing_callers() {
        let db = Arc::new(StatementDb::in_memory());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = Arc::clone(&db);
                tokio::spawn(async move { db.open().await.unwrap() })
            })
            .collect();

        let mut opened = Vec::new();
        for h in handles {
            opened.push(h.await.unwrap());
        }
        for handle in &opened[1..] {
            assert!(Arc::ptr_eq(&opened[0], handle));
        }
        assert!(db.is_open());
    }

    #[tokio::test]
    async fn operations_open_lazily() {
        let db = StatementDb::in_memory();
        assert!(!db.is_open());
        assert!(db.get_by_wki("foo").await.unwrap().is_empty());
        assert!(db.is_open());
    }

    #[tokio::test]
    async fn failed_open_is_retryable() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the log file should be makes open fail.
        let path = dir.path().join("statements.log");
        std::fs::create_dir(&path).unwrap();

        let db = StatementDb::new(StoreConfig::at_path(&path));
        let err = db.open().await.unwrap_err();
        assert!(err.is_storage_fault());
        assert!(!db.is_open());

        std::fs::remove_dir(&path).unwrap();
        db.open().await.unwrap();
        assert!(db.is_open());
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn statements_survive_reopen_in_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::at_path(dir.path().join("statements.log"));

        let db = StatementDb::new(config.clone());
        for s in seed() {
            db.put(s).await.unwrap();
        }
        // Overwrite the first statement with new refs and namespace.
        let replaced = stmt("QmF001234:foo:5678", "other.ns", &["foo:new"]);
        db.put(replaced.clone()).await.unwrap();
        db.close().await.unwrap();

        let db = StatementDb::new(config);
        assert_eq!(db.len().await.unwrap(), 2);
        assert_eq!(
            db.get_by_namespace("*").await.unwrap(),
            vec![replaced.clone(), seed()[1].clone()]
        );
        assert!(db.get_by_wki("foo:bar123").await.unwrap().is_empty());
        assert_eq!(db.get_by_wki("foo:new").await.unwrap(), vec![replaced]);
    }

    #[tokio::test]
    async fn compact_keeps_live_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statements.log");
        let config = StoreConfig::at_path(&path);

        let db = StatementDb::new(config.clone());
        for _ in 0..5 {
            for s in seed() {
                db.put(s).await.unwrap();
            }
        }
        let before = std::fs::metadata(&path).unwrap().len();
        db.compact().await.unwrap();
        let after = std::fs::metadata(&path).unwrap().len();
        assert!(after < before);
        db.close().await.unwrap();

        let db = StatementDb::new(config);
        assert_eq!(db.get_by_namespace("*").await.unwrap(), seed());
    }

    #[tokio::test]
    async fn concurrent_puts_on_shared_buckets_lose_nothing() {
        let db = Arc::new(StatementDb::in_memory());
        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let db = Arc::clone(&db);
                tokio::spawn(async move {
                    let s = stmt(&format!("root:foo:{i}"), "scratch.shared", &["shared:wki"]);
                    db.put(s).await.unwrap();
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(db.get_by_wki("shared:wki").await.unwrap().len(), 32);
        assert_eq!(db.get_by_namespace("scratch.shared").await.unwrap().len(), 32);
        // Both indices agree with the primary order.
        let order = db.ids().await.unwrap();
        let by_wki: Vec<_> = db
            .get_by_wki("shared:wki")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, by_wki);
    }

    const RACING_WRITERS: usize = 8;

    fn variant(writer: usize) -> Statement {
        stmt(
            "root:foo:1",
            &format!("scratch.w{writer}"),
            &[&format!("wki:{writer}")],
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_puts_to_one_id_never_expose_mixed_indices() {
        let db = Arc::new(StatementDb::in_memory());
        let handle = db.open().await.unwrap();
        let id = StatementId::from("root:foo:1");
        db.put(variant(0)).await.unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let readers: Vec<_> = (0..2)
            .map(|_| {
                let handle = Arc::clone(&handle);
                let done = Arc::clone(&done);
                let id = id.clone();
                tokio::spawn(async move {
                    let mut snapshots = 0usize;
                    while snapshots == 0 || !done.load(Ordering::Acquire) {
                        {
                            let index = handle.read_index().unwrap();
                            let current = index.get(&id).cloned().unwrap();
                            let by_wki: Vec<usize> = (0..RACING_WRITERS)
                                .filter(|w| index.by_wki(&format!("wki:{w}")).iter().any(|s| s.id == id))
                                .collect();
                            let by_namespace: Vec<usize> = (0..RACING_WRITERS)
                                .filter(|w| {
                                    index
                                        .by_namespace(&format!("scratch.w{w}"))
                                        .iter()
                                        .any(|s| s.id == id)
                                })
                                .collect();

                            assert_eq!(index.len(), 1);
                            assert_eq!(by_wki.len(), 1, "id indexed under {by_wki:?}");
                            assert_eq!(by_namespace, by_wki);
                            assert_eq!(current, variant(by_wki[0]));
                        }
                        snapshots += 1;
                        tokio::task::yield_now().await;
                    }
                    snapshots
                })
            })
            .collect();

        let writers: Vec<_> = (0..RACING_WRITERS)
            .map(|w| {
                let db = Arc::clone(&db);
                tokio::spawn(async move {
                    for _ in 0..50 {
                        db.put(variant(w)).await.unwrap();
                    }
                })
            })
            .collect();
        for t in writers {
            t.await.unwrap();
        }
        done.store(true, Ordering::Release);
        for r in readers {
            assert!(r.await.unwrap() > 0);
        }

        // The last write wins everywhere.
        let last = db.get(&id).await.unwrap().unwrap();
        let winner = (0..RACING_WRITERS)
            .find(|&w| variant(w) == last)
            .unwrap();
        for w in 0..RACING_WRITERS {
            let hits = db.get_by_wki(&format!("wki:{w}")).await.unwrap();
            if w == winner {
                assert_eq!(hits, vec![last.clone()]);
            } else {
                assert!(hits.is_empty());
            }
        }
        assert_eq!(db.get_by_namespace("scratch.*").await.unwrap(), vec![last]);
    }
}

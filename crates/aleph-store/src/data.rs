//! Local data object storage.
//!
//! Data objects are opaque `(content id, bytes)` pairs. The remote fetch
//! server resolves requested ids against a [`DataStore`]; nothing here looks
//! inside a payload.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use aleph_crypto::ContentHasher;
use aleph_types::ContentId;
use bytes::Bytes;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Content-id keyed object store.
///
/// Implementations must be safe to share across connection tasks.
pub trait DataStore: Send + Sync {
    /// Read an object. `Ok(None)` if the id is unknown.
    fn get(&self, id: &ContentId) -> StoreResult<Option<Bytes>>;

    /// Store `data` under an externally chosen id, replacing any previous value.
    fn insert(&self, id: ContentId, data: Bytes) -> StoreResult<()>;

    /// Check whether an object exists.
    fn contains(&self, id: &ContentId) -> StoreResult<bool>;

    /// Store `data` under its BLAKE3 content id and return the id.
    fn put(&self, data: Bytes) -> StoreResult<ContentId> {
        let id = ContentHasher::DATA.hash(&data);
        self.insert(id.clone(), data)?;
        Ok(id)
    }

    /// Read several objects. Each id resolves independently: a failure for
    /// one slot does not affect the others.
    fn get_batch(&self, ids: &[ContentId]) -> Vec<StoreResult<Option<Bytes>>> {
        ids.iter().map(|id| self.get(id)).collect()
    }
}

/// In-memory, HashMap-based data store.
///
/// Payloads are `Bytes`, so reads hand out cheap clones.
pub struct InMemoryDataStore {
    objects: RwLock<HashMap<ContentId, Bytes>>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .map(|map| map.values().map(|data| data.len() as u64).sum())
            .unwrap_or(0)
    }

    fn poisoned(e: impl std::fmt::Display) -> StoreError {
        StoreError::Poisoned(format!("data store: {e}"))
    }
}

impl Default for InMemoryDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DataStore for InMemoryDataStore {
    fn get(&self, id: &ContentId) -> StoreResult<Option<Bytes>> {
        let map = self.objects.read().map_err(Self::poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn insert(&self, id: ContentId, data: Bytes) -> StoreResult<()> {
        let mut map = self.objects.write().map_err(Self::poisoned)?;
        map.insert(id, data);
        Ok(())
    }

    fn contains(&self, id: &ContentId) -> StoreResult<bool> {
        let map = self.objects.read().map_err(Self::poisoned)?;
        Ok(map.contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDataStore")
            .field("object_count", &self.len())
            .finish()
    }
}

/// Data store keeping one file per object in a directory, named by the
/// object's id. Writes go through a temp file renamed into place, so a
/// reader sees either the old bytes or the new ones.
///
/// Ids that are not plain file names (empty, containing a path separator,
/// or starting with `.`) are never stored and always read as absent.
pub struct DirDataStore {
    dir: PathBuf,
}

impl DirDataStore {
    /// Open the store, creating `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "data store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &ContentId) -> Option<PathBuf> {
        let name = id.as_str();
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\', '\0']);
        plain.then(|| self.dir.join(name))
    }
}

impl DataStore for DirDataStore {
    fn get(&self, id: &ContentId) -> StoreResult<Option<Bytes>> {
        let Some(path) = self.path_for(id) else {
            return Ok(None);
        };
        match fs::read(&path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn insert(&self, id: ContentId, data: Bytes) -> StoreResult<()> {
        let path = self
            .path_for(&id)
            .ok_or_else(|| StoreError::InvalidId(id.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn contains(&self, id: &ContentId) -> StoreResult<bool> {
        Ok(self.path_for(id).is_some_and(|path| path.is_file()))
    }
}

impl std::fmt::Debug for DirDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirDataStore").field("dir", &self.dir).finish()
    }
}

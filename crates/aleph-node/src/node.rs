use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use aleph_crypto::{sign_statement, verify_statement, SigningKey, VerifyingKey};
use aleph_fetch::{FetchResult, PeerHandle, RemoteFetchClient, RemoteFetchServer};
use aleph_store::{DataStore, DirDataStore, InMemoryDataStore, StatementDb, StatementStore, Upsert};
use aleph_types::{
    validate_namespace, ContentId, PeerId, SimpleStatement, Statement, StatementDraft, StatementId,
};
use bytes::Bytes;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::{NodeError, NodeResult};
use crate::keys;

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// An aleph peer node.
///
/// Owns the node key, the local statement and data stores, the remote fetch
/// server answering other peers, and a static directory of known peers.
pub struct AlephNode {
    config: NodeConfig,
    key: SigningKey,
    peer_id: PeerId,
    statements: Arc<dyn StatementStore>,
    data: Arc<dyn DataStore>,
    fetch: RemoteFetchClient,
    peers: RwLock<BTreeMap<PeerId, SocketAddr>>,
    /// Next sequence number for this node's own statements. Resolved from
    /// the store on first publish.
    next_sequence: Mutex<Option<u64>>,
    server: Mutex<Option<RunningServer>>,
}

impl AlephNode {
    /// Build a node from its configuration: load or create the key, and set
    /// up the stores described by `config`. The statement log is not opened
    /// and nothing is bound until [`start`](Self::start).
    pub fn new(config: NodeConfig) -> NodeResult<Self> {
        let key = keys::load_or_generate(config.key_file.as_deref())?;
        let statements: Arc<dyn StatementStore> = Arc::new(StatementDb::new(config.store_config()));
        let data: Arc<dyn DataStore> = match config.objects_dir() {
            Some(dir) => Arc::new(DirDataStore::open(dir)?),
            None => Arc::new(InMemoryDataStore::new()),
        };
        Ok(Self::with_stores(config, key, statements, data))
    }

    /// Build a node over caller-supplied stores.
    pub fn with_stores(
        config: NodeConfig,
        key: SigningKey,
        statements: Arc<dyn StatementStore>,
        data: Arc<dyn DataStore>,
    ) -> Self {
        let peer_id = key.peer_id();
        let peers = RwLock::new(config.peers.clone());
        Self {
            fetch: RemoteFetchClient::new(peer_id.clone()),
            config,
            key,
            peer_id,
            statements,
            data,
            peers,
            next_sequence: Mutex::new(None),
            server: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// This node's peer id (hex Ed25519 public key).
    pub fn id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    // ---- Lifecycle ----

    /// Open the statement store and start answering remote fetch requests.
    /// Returns the bound fetch address. Calling it again while running
    /// returns the same address.
    pub async fn start(&self) -> NodeResult<SocketAddr> {
        let mut server = self.server.lock().await;
        if let Some(running) = server.as_ref() {
            return Ok(running.addr);
        }

        let statements = self.statements.len().await?;
        let fetch_server =
            RemoteFetchServer::bind(self.config.fetch_addr, Arc::clone(&self.data), self.peer_id.clone())
                .await?;
        let addr = fetch_server.local_addr()?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(fetch_server.serve_with_shutdown(async move {
            // A dropped sender also stops the server.
            let _ = signal.await;
        }));
        *server = Some(RunningServer { addr, shutdown, task });

        info!(peer_id = %self.peer_id, fetch_addr = %addr, statements, "node started");
        Ok(addr)
    }

    /// Stop the fetch server and flush the statement store.
    pub async fn shutdown(&self) -> NodeResult<()> {
        if let Some(running) = self.server.lock().await.take() {
            let _ = running.shutdown.send(());
            running
                .task
                .await
                .map_err(|e| NodeError::Internal(format!("fetch server task: {e}")))?;
        }
        self.statements.flush().await?;
        info!(peer_id = %self.peer_id, "node stopped");
        Ok(())
    }

    /// Address of the running fetch server, if started.
    pub async fn fetch_addr(&self) -> Option<SocketAddr> {
        self.server.lock().await.as_ref().map(|running| running.addr)
    }

    // ---- Statements ----

    /// Publish a statement under `namespace` and return its id.
    ///
    /// The node assigns the id `<peerId>:<publisher>:<sequence>`, stamps the
    /// current time, and signs the statement with its key.
    pub async fn publish(&self, namespace: &str, body: SimpleStatement) -> NodeResult<StatementId> {
        validate_namespace(namespace)?;

        let mut next = self.next_sequence.lock().await;
        let sequence = match *next {
            Some(sequence) => sequence,
            None => self.resume_sequence().await?,
        };

        let id = StatementId::compose(&self.peer_id, &self.config.publisher, sequence);
        let draft = StatementDraft {
            publisher: self.config.publisher.clone(),
            namespace: namespace.to_string(),
            body: body.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        let statement = sign_statement(&self.key, draft, id.clone())?;
        self.statements.put(statement).await?;
        *next = Some(sequence + 1);

        debug!(id = %id, namespace, "statement published");
        Ok(id)
    }

    /// Store a statement received from elsewhere, as-is.
    pub async fn put_statement(&self, statement: Statement) -> NodeResult<Upsert> {
        Ok(self.statements.put(statement).await?)
    }

    pub async fn statement(&self, id: &StatementId) -> NodeResult<Statement> {
        self.statements
            .get(id)
            .await?
            .ok_or_else(|| NodeError::StatementNotFound(id.clone()))
    }

    pub async fn statements_by_wki(&self, wki: &str) -> NodeResult<Vec<Statement>> {
        Ok(self.statements.get_by_wki(wki).await?)
    }

    pub async fn statements_by_namespace(&self, pattern: &str) -> NodeResult<Vec<Statement>> {
        Ok(self.statements.get_by_namespace(pattern).await?)
    }

    /// Check a statement's signature against the key of the peer that
    /// issued its id.
    pub fn verify_statement(&self, statement: &Statement) -> NodeResult<()> {
        let (root, _, _) = statement.id.parts()?;
        let key = VerifyingKey::from_peer_id(&PeerId::from(root))?;
        verify_statement(&key, statement)?;
        Ok(())
    }

    /// One past the highest sequence this node already used for its
    /// publisher name.
    async fn resume_sequence(&self) -> NodeResult<u64> {
        let highest = self
            .statements
            .ids()
            .await?
            .iter()
            .filter_map(|id| match id.parts() {
                Ok((root, publisher, sequence))
                    if root == self.peer_id.as_str() && publisher == self.config.publisher =>
                {
                    Some(sequence)
                }
                _ => None,
            })
            .max();
        Ok(highest.map_or(0, |sequence| sequence + 1))
    }

    // ---- Data objects ----

    /// Store a data object under its content id.
    pub fn put_data(&self, data: impl Into<Bytes>) -> NodeResult<ContentId> {
        Ok(self.data.put(data.into())?)
    }

    pub fn data(&self, id: &ContentId) -> NodeResult<Option<Bytes>> {
        Ok(self.data.get(id)?)
    }

    // ---- Peers ----

    pub fn add_peer(&self, peer_id: PeerId, addr: SocketAddr) -> NodeResult<()> {
        self.peers_mut()?.insert(peer_id, addr);
        Ok(())
    }

    pub fn remove_peer(&self, peer_id: &PeerId) -> NodeResult<bool> {
        Ok(self.peers_mut()?.remove(peer_id).is_some())
    }

    pub fn peers(&self) -> NodeResult<Vec<PeerHandle>> {
        let peers = self
            .peers
            .read()
            .map_err(|e| NodeError::Internal(format!("peer directory: {e}")))?;
        Ok(peers
            .iter()
            .map(|(peer_id, addr)| PeerHandle::new(*addr).with_peer_id(peer_id.clone()))
            .collect())
    }

    /// Resolve a peer id through the directory.
    pub fn peer_handle(&self, peer_id: &PeerId) -> NodeResult<PeerHandle> {
        let peers = self
            .peers
            .read()
            .map_err(|e| NodeError::Internal(format!("peer directory: {e}")))?;
        peers
            .get(peer_id)
            .map(|addr| PeerHandle::new(*addr).with_peer_id(peer_id.clone()))
            .ok_or_else(|| NodeError::UnknownPeer(peer_id.clone()))
    }

    /// Liveness check of a known peer. Returns the round-trip time.
    pub async fn ping(&self, peer_id: &PeerId) -> NodeResult<Duration> {
        let peer = self.peer_handle(peer_id)?;
        match self.fetch.ping(&peer).await {
            Ok(rtt) => Ok(rtt),
            Err(e) => {
                warn!(peer = %peer, error = %e, "ping failed");
                Err(e.into())
            }
        }
    }

    /// Fetch data objects from a remote peer, in request order.
    pub async fn remote_data(&self, peer: &PeerHandle, ids: &[ContentId]) -> NodeResult<Vec<FetchResult>> {
        Ok(self.fetch.remote_data(peer, ids).await?)
    }

    fn peers_mut(&self) -> NodeResult<std::sync::RwLockWriteGuard<'_, BTreeMap<PeerId, SocketAddr>>> {
        self.peers
            .write()
            .map_err(|e| NodeError::Internal(format!("peer directory: {e}")))
    }
}

impl std::fmt::Debug for AlephNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlephNode")
            .field("peer_id", &self.peer_id)
            .field("publisher", &self.config.publisher)
            .finish()
    }
}

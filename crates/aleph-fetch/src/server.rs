//! Peer-side answer to remote fetch requests.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use aleph_protocol::{error_codes, FetchCodec, FetchMessage, MAX_MESSAGE_SIZE, PROTOCOL_VERSION};
use aleph_store::DataStore;
use aleph_types::{ContentId, PeerId};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};
use crate::types::FetchResult;

/// Serves data objects from a local [`DataStore`] to connecting peers.
pub struct RemoteFetchServer {
    listener: TcpListener,
    store: Arc<dyn DataStore>,
    peer_id: PeerId,
}

impl RemoteFetchServer {
    /// Bind the listening socket. Use port 0 to pick a free port.
    pub async fn bind(addr: SocketAddr, store: Arc<dyn DataStore>, peer_id: PeerId) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            store,
            peer_id,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped.
    pub async fn serve(self) {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Accept connections until `shutdown` completes. Connections already
    /// accepted run to completion on their own tasks.
    pub async fn serve_with_shutdown<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.listener.local_addr().ok();
        info!(?addr, peer_id = %self.peer_id, "remote fetch server listening");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(?addr, "remote fetch server shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(%remote, error = %e, "set_nodelay failed");
                        }
                        let store = Arc::clone(&self.store);
                        let peer_id = self.peer_id.clone();
                        tokio::spawn(async move {
                            debug!(%remote, "fetch connection accepted");
                            match serve_connection(stream, store.as_ref(), &peer_id).await {
                                Ok(()) => debug!(%remote, "fetch connection closed"),
                                Err(e) => warn!(%remote, error = %e, "fetch connection failed"),
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept fetch connection"),
                },
            }
        }
    }
}

impl std::fmt::Debug for RemoteFetchServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFetchServer")
            .field("addr", &self.listener.local_addr().ok())
            .field("peer_id", &self.peer_id)
            .finish()
    }
}

/// Run the server side of one fetch connection to completion.
///
/// The first message must be a `Hello` with a matching protocol version.
/// After that every `DataRequest` gets its results (split into `DataChunk`
/// frames when needed) and every `Ping` a `Pong`, until the peer closes the
/// stream. A request whose answer holds an object too large for any frame
/// gets an `Error` and the connection stays open.
pub async fn serve_connection<S>(mut stream: S, store: &dyn DataStore, peer_id: &PeerId) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Some(hello) = FetchCodec::read(&mut stream).await? else {
        return Ok(());
    };
    match hello {
        FetchMessage::Hello { version, peer_id: remote } if version == PROTOCOL_VERSION => {
            debug!(remote = %remote, "fetch handshake");
            let ack = FetchMessage::HelloAck {
                version: PROTOCOL_VERSION,
                peer_id: peer_id.clone(),
            };
            FetchCodec::write(&mut stream, &ack).await?;
        }
        FetchMessage::Hello { version, .. } => {
            let reply = FetchMessage::Error {
                code: error_codes::UNSUPPORTED_VERSION,
                message: format!("unsupported protocol version {version}, expected {PROTOCOL_VERSION}"),
            };
            FetchCodec::write(&mut stream, &reply).await?;
            return Err(FetchError::Remote {
                code: error_codes::UNSUPPORTED_VERSION,
                message: format!("peer spoke protocol version {version}"),
            });
        }
        other => return reject(&mut stream, "Hello", other).await,
    }

    while let Some(msg) = FetchCodec::read(&mut stream).await? {
        let replies = match msg {
            FetchMessage::DataRequest { ids } => answer(store, &ids, MAX_MESSAGE_SIZE),
            FetchMessage::Ping { nonce } => vec![FetchMessage::Pong { nonce }],
            other => return reject(&mut stream, "DataRequest or Ping", other).await,
        };
        for reply in &replies {
            FetchCodec::write(&mut stream, reply).await?;
        }
    }
    Ok(())
}

/// The frames answering one data request.
fn answer(store: &dyn DataStore, ids: &[ContentId], max_payload: usize) -> Vec<FetchMessage> {
    match FetchCodec::split_response(resolve(store, ids), max_payload) {
        Ok(frames) => {
            if frames.len() > 1 {
                debug!(requested = ids.len(), frames = frames.len(), "data response split");
            }
            frames
        }
        Err(e) => {
            warn!(requested = ids.len(), error = %e, "data response cannot be framed");
            vec![FetchMessage::Error {
                code: error_codes::TOO_LARGE,
                message: e.to_string(),
            }]
        }
    }
}

/// Resolve every id independently, in request order. A lookup failure for
/// one id becomes a missing marker for that slot only.
pub fn resolve(store: &dyn DataStore, ids: &[ContentId]) -> Vec<FetchResult> {
    let results: Vec<FetchResult> = ids
        .iter()
        .zip(store.get_batch(ids))
        .map(|(id, lookup)| match lookup {
            Ok(Some(data)) => FetchResult::found(id.clone(), data.to_vec()),
            Ok(None) => FetchResult::missing(id.clone()),
            Err(e) => {
                warn!(id = %id, error = %e, "data lookup failed; answering missing");
                FetchResult::missing(id.clone())
            }
        })
        .collect();
    debug!(
        requested = ids.len(),
        found = results.iter().filter(|r| r.value.is_found()).count(),
        "data request resolved"
    );
    results
}

async fn reject<S>(stream: &mut S, expected: &'static str, got: FetchMessage) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let reply = FetchMessage::Error {
        code: error_codes::BAD_REQUEST,
        message: format!("expected {expected}, received {}", got.type_name()),
    };
    FetchCodec::write(stream, &reply).await?;
    Err(FetchError::UnexpectedMessage {
        expected,
        actual: got.type_name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aleph_protocol::DataValue;
    use aleph_store::{InMemoryDataStore, StoreError, StoreResult};
    use bytes::Bytes;

    /// A store whose lookups fail for one specific id.
    struct FlakyStore {
        inner: InMemoryDataStore,
        broken: ContentId,
    }

    impl DataStore for FlakyStore {
        fn get(&self, id: &ContentId) -> StoreResult<Option<Bytes>> {
            if id == &self.broken {
                return Err(StoreError::Io(io::ErrorKind::Other.into()));
            }
            self.inner.get(id)
        }

        fn insert(&self, id: ContentId, data: Bytes) -> StoreResult<()> {
            self.inner.insert(id, data)
        }

        fn contains(&self, id: &ContentId) -> StoreResult<bool> {
            self.inner.contains(id)
        }
    }

    fn hello() -> FetchMessage {
        FetchMessage::Hello {
            version: PROTOCOL_VERSION,
            peer_id: PeerId::from("client"),
        }
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_keeps_request_order() {
        let store = InMemoryDataStore::new();
        store.insert(ContentId::from("a"), Bytes::from_static(b"A")).unwrap();
        store.insert(ContentId::from("c"), Bytes::from_static(b"C")).unwrap();

        let ids: Vec<ContentId> = ["a", "b", "c", "a"].into_iter().map(ContentId::from).collect();
        let results = resolve(&store, &ids);

        let keys: Vec<&str> = results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c", "a"]);
        assert_eq!(results[0].value, DataValue::Found(b"A".to_vec()));
        assert_eq!(results[1].value, DataValue::Missing);
        assert_eq!(results[2].value, DataValue::Found(b"C".to_vec()));
        assert_eq!(results[3].value, DataValue::Found(b"A".to_vec()));
    }

    #[test]
    fn one_failed_lookup_does_not_abort_others() {
        let store = FlakyStore {
            inner: InMemoryDataStore::new(),
            broken: ContentId::from("bad"),
        };
        store.insert(ContentId::from("good"), Bytes::from_static(b"ok")).unwrap();

        let ids = vec![ContentId::from("bad"), ContentId::from("good")];
        let results = resolve(&store, &ids);
        assert_eq!(results[0], FetchResult::missing(ContentId::from("bad")));
        assert_eq!(results[1], FetchResult::found(ContentId::from("good"), b"ok".to_vec()));
    }

    #[test]
    fn oversized_answer_split_into_chunks() {
        let store = InMemoryDataStore::new();
        store.insert(ContentId::from("a"), Bytes::from(vec![1u8; 200])).unwrap();
        store.insert(ContentId::from("b"), Bytes::from(vec![2u8; 200])).unwrap();

        let frames = answer(&store, &[ContentId::from("a"), ContentId::from("b")], 300);
        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], FetchMessage::DataChunk { results } if results[0].key.as_str() == "a"));
        assert!(matches!(&frames[1], FetchMessage::DataResponse { results } if results[0].key.as_str() == "b"));
    }

    #[test]
    fn unframeable_answer_becomes_error() {
        let store = InMemoryDataStore::new();
        store.insert(ContentId::from("huge"), Bytes::from(vec![0u8; 1000])).unwrap();

        let frames = answer(&store, &[ContentId::from("huge")], 300);
        assert!(matches!(
            frames.as_slice(),
            [FetchMessage::Error { code: error_codes::TOO_LARGE, .. }]
        ));
    }

    // -----------------------------------------------------------------------
    // Connection handling
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn handshake_then_requests() {
        let (mut client, server) = tokio::io::duplex(4096);
        let store = InMemoryDataStore::new();
        store.insert(ContentId::from("k1"), Bytes::from_static(b"v1")).unwrap();

        let task = tokio::spawn(async move {
            serve_connection(server, &store, &PeerId::from("server")).await
        });

        FetchCodec::write(&mut client, &hello()).await.unwrap();
        let ack = FetchCodec::read(&mut client).await.unwrap().unwrap();
        assert_eq!(
            ack,
            FetchMessage::HelloAck { version: PROTOCOL_VERSION, peer_id: PeerId::from("server") }
        );

        let request = FetchMessage::DataRequest { ids: vec![ContentId::from("k1"), ContentId::from("k2")] };
        FetchCodec::write(&mut client, &request).await.unwrap();
        let response = FetchCodec::read(&mut client).await.unwrap().unwrap();
        assert_eq!(
            response,
            FetchMessage::DataResponse {
                results: vec![
                    FetchResult::found(ContentId::from("k1"), b"v1".to_vec()),
                    FetchResult::missing(ContentId::from("k2")),
                ]
            }
        );

        FetchCodec::write(&mut client, &FetchMessage::Ping { nonce: 9 }).await.unwrap();
        assert_eq!(
            FetchCodec::read(&mut client).await.unwrap().unwrap(),
            FetchMessage::Pong { nonce: 9 }
        );

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn version_mismatch_rejected() {
        let (mut client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(async move {
            let store = InMemoryDataStore::new();
            serve_connection(server, &store, &PeerId::from("server")).await
        });

        let hello = FetchMessage::Hello { version: PROTOCOL_VERSION + 1, peer_id: PeerId::from("c") };
        FetchCodec::write(&mut client, &hello).await.unwrap();
        match FetchCodec::read(&mut client).await.unwrap().unwrap() {
            FetchMessage::Error { code, .. } => assert_eq!(code, error_codes::UNSUPPORTED_VERSION),
            other => panic!("unexpected reply: {other:?}"),
        }
        assert!(task.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn request_before_hello_rejected() {
        let (mut client, server) = tokio::io::duplex(4096);
        let task = tokio::spawn(async move {
            let store = InMemoryDataStore::new();
            serve_connection(server, &store, &PeerId::from("server")).await
        });

        let request = FetchMessage::DataRequest { ids: vec![] };
        FetchCodec::write(&mut client, &request).await.unwrap();
        match FetchCodec::read(&mut client).await.unwrap().unwrap() {
            FetchMessage::Error { code, .. } => assert_eq!(code, error_codes::BAD_REQUEST),
            other => panic!("unexpected reply: {other:?}"),
        }
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedMessage { expected: "Hello", .. }));
    }

    #[tokio::test]
    async fn immediate_close_is_clean() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);
        let store = InMemoryDataStore::new();
        serve_connection(server, &store, &PeerId::from("server")).await.unwrap();
    }
}

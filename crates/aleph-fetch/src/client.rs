//! Fetching data objects from a remote peer.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use aleph_protocol::{FetchCodec, FetchMessage, PROTOCOL_VERSION};
use aleph_types::{ContentId, PeerId};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::error::{FetchError, Result};
use crate::transport::{Connector, TcpConnector};
use crate::types::{FetchResult, PeerHandle};
use crate::verifier::ResponseVerifier;

/// Client side of the remote fetch protocol.
///
/// Each [`remote_data`](Self::remote_data) call opens its own connection.
/// Callers that issue many requests to one peer can hold a
/// [`FetchConnection`] from [`connect`](Self::connect) instead.
#[derive(Debug)]
pub struct RemoteFetchClient<C = TcpConnector> {
    connector: C,
    local_peer: PeerId,
}

impl RemoteFetchClient<TcpConnector> {
    pub fn new(local_peer: PeerId) -> Self {
        Self::with_connector(TcpConnector, local_peer)
    }
}

impl<C: Connector> RemoteFetchClient<C> {
    pub fn with_connector(connector: C, local_peer: PeerId) -> Self {
        Self {
            connector,
            local_peer,
        }
    }

    pub fn local_peer(&self) -> &PeerId {
        &self.local_peer
    }

    /// Fetch the objects named by `ids` from `peer`.
    ///
    /// The i-th result answers the i-th id, and its key equals that id.
    /// Duplicated ids are answered once per occurrence. An empty list
    /// returns immediately without contacting the peer. Either the complete
    /// ordered list is returned or an error; never a partial list.
    pub async fn remote_data(&self, peer: &PeerHandle, ids: &[ContentId]) -> Result<Vec<FetchResult>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connect(peer).await?;
        let results = conn.fetch(ids).await?;
        info!(
            peer = %peer,
            requested = ids.len(),
            found = results.iter().filter(|r| r.value.is_found()).count(),
            "remote data fetched"
        );
        Ok(results)
    }

    /// Check that `peer` is reachable and answering. Returns the round-trip
    /// time of the ping exchange.
    pub async fn ping(&self, peer: &PeerHandle) -> Result<Duration> {
        let mut conn = self.connect(peer).await?;
        conn.ping().await
    }

    /// Open a connection to `peer` and complete the handshake.
    pub async fn connect(&self, peer: &PeerHandle) -> Result<FetchConnection<C::Stream>> {
        let stream = self
            .connector
            .connect(peer.addr)
            .await
            .map_err(|source| FetchError::Connection {
                addr: peer.addr,
                source,
            })?;
        FetchConnection::handshake(stream, peer, &self.local_peer).await
    }
}

/// An established, handshaken connection to one remote peer.
#[derive(Debug)]
pub struct FetchConnection<S> {
    stream: S,
    addr: SocketAddr,
    remote_peer: PeerId,
}

impl<S> FetchConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Exchange `Hello` / `HelloAck` over `stream`. Any failure here is a
    /// handshake fault.
    pub async fn handshake(mut stream: S, peer: &PeerHandle, local_peer: &PeerId) -> Result<Self> {
        let addr = peer.addr;
        let fail = |reason: String| FetchError::Handshake { addr, reason };

        let hello = FetchMessage::Hello {
            version: PROTOCOL_VERSION,
            peer_id: local_peer.clone(),
        };
        FetchCodec::write(&mut stream, &hello)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let reply = FetchCodec::read(&mut stream)
            .await
            .map_err(|e| fail(e.to_string()))?
            .ok_or_else(|| fail("connection closed during handshake".into()))?;

        let remote_peer = match reply {
            FetchMessage::HelloAck { version, peer_id } if version == PROTOCOL_VERSION => peer_id,
            FetchMessage::HelloAck { version, .. } => {
                return Err(fail(format!(
                    "protocol version mismatch: local {PROTOCOL_VERSION}, remote {version}"
                )))
            }
            FetchMessage::Error { code, message } => {
                return Err(fail(format!("rejected with code {code}: {message}")))
            }
            other => return Err(fail(format!("expected HelloAck, received {}", other.type_name()))),
        };

        if let Some(expected) = &peer.peer_id {
            if expected != &remote_peer {
                return Err(fail(format!("expected peer {expected}, connected to {remote_peer}")));
            }
        }

        debug!(%addr, remote_peer = %remote_peer, "fetch handshake complete");
        Ok(Self {
            stream,
            addr,
            remote_peer,
        })
    }

    pub fn remote_peer(&self) -> &PeerId {
        &self.remote_peer
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send one ordered id list and return the verified, ordered results.
    ///
    /// `DataChunk` frames are collected until the closing `DataResponse`;
    /// verification runs on the joined list.
    pub async fn fetch(&mut self, ids: &[ContentId]) -> Result<Vec<FetchResult>> {
        let request = FetchMessage::DataRequest { ids: ids.to_vec() };
        FetchCodec::write(&mut self.stream, &request).await?;

        let mut results = Vec::with_capacity(ids.len());
        loop {
            match self.next_message().await? {
                FetchMessage::DataChunk { results: chunk } => {
                    results.extend(chunk);
                    if results.len() > ids.len() {
                        return Err(FetchError::CountMismatch {
                            expected: ids.len(),
                            actual: results.len(),
                        });
                    }
                }
                FetchMessage::DataResponse { results: last } => {
                    results.extend(last);
                    break;
                }
                other => return Err(unexpected("DataResponse", other)),
            }
        }
        ResponseVerifier::verify(ids, &results)?;
        Ok(results)
    }

    /// Send a `Ping` and wait for the matching `Pong`.
    pub async fn ping(&mut self) -> Result<Duration> {
        let nonce: u64 = rand::random();
        let started = Instant::now();
        match self.exchange(&FetchMessage::Ping { nonce }).await? {
            FetchMessage::Pong { nonce: echoed } if echoed == nonce => {
                let rtt = started.elapsed();
                debug!(addr = %self.addr, ?rtt, "pong");
                Ok(rtt)
            }
            FetchMessage::Pong { .. } => Err(FetchError::UnexpectedMessage {
                expected: "Pong with matching nonce",
                actual: "Pong",
            }),
            other => Err(unexpected("Pong", other)),
        }
    }

    async fn exchange(&mut self, msg: &FetchMessage) -> Result<FetchMessage> {
        FetchCodec::write(&mut self.stream, msg).await?;
        self.next_message().await
    }

    async fn next_message(&mut self) -> Result<FetchMessage> {
        FetchCodec::read(&mut self.stream)
            .await?
            .ok_or(FetchError::Closed { addr: self.addr })
    }
}

fn unexpected(expected: &'static str, got: FetchMessage) -> FetchError {
    match got {
        FetchMessage::Error { code, message } => FetchError::Remote { code, message },
        other => FetchError::UnexpectedMessage {
            expected,
            actual: other.type_name(),
        },
    }
}

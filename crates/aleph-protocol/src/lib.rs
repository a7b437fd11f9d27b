//! Wire protocol for aleph peers.
//!
//! Defines the framing and message types of the remote fetch protocol that
//! peers use to pull data objects from each other, plus the paths of the
//! administrative HTTP surface each node serves.
//!
//! The load-bearing rule of the fetch protocol: the answer to a
//! `DataRequest` carries exactly one [`FetchResult`] per requested id, in
//! request order, with each result's `key` equal to the id requested at that
//! position. Answers larger than one frame are split into `DataChunk` frames
//! by [`FetchCodec::split_response`].

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;

pub use codec::FetchCodec;
pub use endpoint::{endpoints, routes, HealthResponse, PingResponse};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    error_codes, DataValue, FetchMessage, FetchResult, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

use aleph_types::{ContentId, PeerId};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// All message types exchanged over a remote fetch connection.
///
/// A connection opens with `Hello` / `HelloAck`, after which the client may
/// send any number of `DataRequest` or `Ping` messages. A `Ping` is answered
/// by one `Pong`. A `DataRequest` is answered by zero or more `DataChunk`
/// frames followed by one `DataResponse`, or by a single `Error`. Chunks and
/// the final response concatenate, in order, into the full result list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchMessage {
    Hello { version: u32, peer_id: PeerId },
    HelloAck { version: u32, peer_id: PeerId },
    DataRequest { ids: Vec<ContentId> },
    DataResponse { results: Vec<FetchResult> },
    /// A leading slice of a response too large for one frame.
    DataChunk { results: Vec<FetchResult> },
    Ping { nonce: u64 },
    Pong { nonce: u64 },
    Error { code: u32, message: String },
}

impl FetchMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Hello { .. } => 1,
            Self::HelloAck { .. } => 2,
            Self::DataRequest { .. } => 3,
            Self::DataResponse { .. } => 4,
            Self::Ping { .. } => 5,
            Self::Pong { .. } => 6,
            Self::DataChunk { .. } => 7,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "Hello",
            Self::HelloAck { .. } => "HelloAck",
            Self::DataRequest { .. } => "DataRequest",
            Self::DataResponse { .. } => "DataResponse",
            Self::Ping { .. } => "Ping",
            Self::Pong { .. } => "Pong",
            Self::DataChunk { .. } => "DataChunk",
            Self::Error { .. } => "Error",
        }
    }
}

/// The value slot of a fetch result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataValue {
    Found(Vec<u8>),
    /// The remote peer has no object under the requested id.
    Missing,
}

impl DataValue {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Found(data) => Some(data),
            Self::Missing => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Found(data) => Some(data),
            Self::Missing => None,
        }
    }
}

/// One `(key, value)` pair of a data response. `key` is always the id that
/// was requested at the same position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub key: ContentId,
    pub value: DataValue,
}

impl FetchResult {
    pub fn found(key: ContentId, data: impl Into<Vec<u8>>) -> Self {
        Self {
            key,
            value: DataValue::Found(data.into()),
        }
    }

    pub fn missing(key: ContentId) -> Self {
        Self {
            key,
            value: DataValue::Missing,
        }
    }
}

/// Codes carried by [`FetchMessage::Error`].
pub mod error_codes {
    pub const BAD_REQUEST: u32 = 400;
    /// A single result does not fit in one frame.
    pub const TOO_LARGE: u32 = 413;
    pub const UNSUPPORTED_VERSION: u32 = 426;
    pub const INTERNAL: u32 = 500;
}

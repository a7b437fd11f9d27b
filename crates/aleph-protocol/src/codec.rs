use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{FetchMessage, FetchResult, MAX_MESSAGE_SIZE};

/// Frame header: 4 bytes length + 1 byte type tag.
const HEADER_SIZE: usize = 5;

/// Codec for encoding/decoding remote fetch messages.
pub struct FetchCodec;

impl FetchCodec {
    /// Encode a message with framing: [4 bytes len][1 byte tag][payload]
    ///
    /// `len` is big-endian and counts the tag byte plus the payload.
    pub fn encode(msg: &FetchMessage) -> ProtocolResult<Vec<u8>> {
        let payload = Self::encode_payload(msg)?;
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.type_tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a framed message. Returns (message, bytes_consumed).
    pub fn decode(data: &[u8]) -> ProtocolResult<(FetchMessage, usize)> {
        if data.len() < HEADER_SIZE {
            return Err(ProtocolError::FramingError("too short".into()));
        }
        let len = frame_len([data[0], data[1], data[2], data[3]])?;
        let total = 4 + len;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        let msg = Self::decode_tagged(data[4], &data[HEADER_SIZE..total])?;
        Ok((msg, total))
    }

    /// Encode payload only (no framing).
    pub fn encode_payload(msg: &FetchMessage) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Decode payload only (no framing).
    pub fn decode_payload(data: &[u8]) -> ProtocolResult<FetchMessage> {
        bincode::deserialize(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }

    /// Split the results of one data request into frames whose payloads
    /// each fit in `max_payload` bytes: any number of `DataChunk` messages
    /// followed by exactly one `DataResponse`. Order is preserved across
    /// frames. Fails with `MessageTooLarge` if a single result cannot fit.
    pub fn split_response(results: Vec<FetchResult>, max_payload: usize) -> ProtocolResult<Vec<FetchMessage>> {
        let envelope = serialized_size(&FetchMessage::DataResponse { results: Vec::new() })?;
        let mut frames = Vec::new();
        let mut batch = Vec::new();
        let mut batch_size = envelope;

        for result in results {
            let size = serialized_size(&result)?;
            if envelope + size > max_payload {
                return Err(ProtocolError::MessageTooLarge {
                    size: envelope + size,
                    max: max_payload,
                });
            }
            if batch_size + size > max_payload {
                frames.push(FetchMessage::DataChunk {
                    results: std::mem::take(&mut batch),
                });
                batch_size = envelope;
            }
            batch_size += size;
            batch.push(result);
        }
        frames.push(FetchMessage::DataResponse { results: batch });
        Ok(frames)
    }

    /// Write one framed message and flush.
    pub async fn write<W>(writer: &mut W, msg: &FetchMessage) -> ProtocolResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let frame = Self::encode(msg)?;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        trace!(kind = msg.type_name(), len = frame.len(), "frame written");
        Ok(())
    }

    /// Read one framed message.
    ///
    /// Returns `Ok(None)` if the peer closed the stream cleanly before a new
    /// frame started. A stream that ends mid-frame is an I/O error.
    pub async fn read<R>(reader: &mut R) -> ProtocolResult<Option<FetchMessage>>
    where
        R: AsyncRead + Unpin,
    {
        let mut len_buf = [0u8; 4];
        let mut filled = 0;
        while filled < len_buf.len() {
            let n = reader.read(&mut len_buf[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(ProtocolError::Io(std::io::ErrorKind::UnexpectedEof.into()));
            }
            filled += n;
        }

        let len = frame_len(len_buf)?;
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).await?;

        let msg = Self::decode_tagged(body[0], &body[1..])?;
        trace!(kind = msg.type_name(), len = len + 4, "frame read");
        Ok(Some(msg))
    }

    fn decode_tagged(tag: u8, payload: &[u8]) -> ProtocolResult<FetchMessage> {
        let msg = Self::decode_payload(payload)?;
        if msg.type_tag() != tag {
            return Err(ProtocolError::InvalidMessageType(tag));
        }
        Ok(msg)
    }
}

fn serialized_size<T: serde::Serialize>(value: &T) -> ProtocolResult<usize> {
    bincode::serialized_size(value)
        .map(|n| n as usize)
        .map_err(|e| ProtocolError::Serialization(e.to_string()))
}

/// Validate a frame length prefix. The result is the byte count after the
/// prefix and is at least 1 (the tag).
fn frame_len(prefix: [u8; 4]) -> ProtocolResult<usize> {
    let len = u32::from_be_bytes(prefix) as usize;
    if len < 1 {
        return Err(ProtocolError::FramingError("zero-length frame".into()));
    }
    if len - 1 > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len - 1,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(len)
}

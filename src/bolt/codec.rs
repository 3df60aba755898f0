//! Chunked message framing for tokio_util.
//!
//! A message goes on the wire as one or more chunks, each a 2-byte
//! big-endian length followed by that many bytes, and ends with a
//! zero-length chunk. Framing knows nothing about message contents.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::message::{BoltRequest, BoltResponse, RawMessage};
use super::BoltError;

/// Default largest chunk payload written
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 16384;

/// Largest chunk payload the 2-byte header can describe
pub const MAX_CHUNK_SIZE: usize = u16::MAX as usize;

/// Default receive limit for one defragmented message (16MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// End of message marker (0x00 0x00)
pub const END_MARKER: [u8; 2] = [0x00, 0x00];

/// Chunk framer.
///
/// Decoding yields [`RawMessage`] bodies; encoding accepts raw bytes or
/// whole messages, which are packed before chunking.
#[derive(Debug)]
pub struct ChunkCodec {
    max_chunk_size: usize,
    max_message_size: usize,
    message_buffer: BytesMut,
}

impl ChunkCodec {
    /// Codec with default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Codec with explicit limits; the chunk size is clamped to `1..=65535`.
    pub fn with_limits(max_chunk_size: usize, max_message_size: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.clamp(1, MAX_CHUNK_SIZE),
            max_message_size,
            message_buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Largest chunk payload written.
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Receive limit for one message.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// True while a message is partially received.
    pub fn in_message(&self) -> bool {
        !self.message_buffer.is_empty()
    }

    /// Split `body` into chunks and terminate with the end marker.
    pub fn write_chunks(&self, body: &[u8], dst: &mut BytesMut) {
        let chunks = body.len().div_ceil(self.max_chunk_size);
        dst.reserve(body.len() + 2 * chunks + END_MARKER.len());
        for chunk in body.chunks(self.max_chunk_size) {
            dst.put_u16(chunk.len() as u16);
            dst.put_slice(chunk);
        }
        dst.put_slice(&END_MARKER);
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkCodec {
    type Item = RawMessage;
    type Error = BoltError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }

            let chunk_size = usize::from(u16::from_be_bytes([src[0], src[1]]));

            if chunk_size == 0 {
                src.advance(2);
                if self.message_buffer.is_empty() {
                    // Zero-length message, nothing to deliver
                    continue;
                }
                let body = self.message_buffer.split().freeze();
                return Ok(Some(RawMessage(body)));
            }

            let size = self.message_buffer.len() + chunk_size;
            if size > self.max_message_size {
                return Err(BoltError::MessageTooLarge {
                    size,
                    max: self.max_message_size,
                });
            }

            if src.len() < 2 + chunk_size {
                src.reserve(2 + chunk_size - src.len());
                return Ok(None);
            }

            src.advance(2);
            self.message_buffer.extend_from_slice(&src[..chunk_size]);
            src.advance(chunk_size);
        }
    }
}

impl Encoder<Bytes> for ChunkCodec {
    type Error = BoltError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.write_chunks(&item, dst);
        Ok(())
    }
}

impl Encoder<&BoltRequest> for ChunkCodec {
    type Error = BoltError;

    fn encode(&mut self, item: &BoltRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = item.encode()?;
        self.write_chunks(&body, dst);
        Ok(())
    }
}

impl Encoder<&BoltResponse> for ChunkCodec {
    type Error = BoltError;

    fn encode(&mut self, item: &BoltResponse, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = item.encode()?;
        self.write_chunks(&body, dst);
        Ok(())
    }
}

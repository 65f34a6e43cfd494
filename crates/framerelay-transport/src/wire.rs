//! Part framing for the local stream transport.
//!
//! A multipart message travels as consecutive parts. Every part carries a
//! flag telling the reader whether more parts of the same message follow.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};

/// Part header: magic (2) + length (4) + flags (1) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// Magic bytes: "FR" (0x46 0x52).
pub const MAGIC: [u8; 2] = [0x46, 0x52];

/// Flag bit: more parts of this message follow.
pub const FLAG_MORE: u8 = 0x01;

/// Default maximum part size: 64 MiB.
pub const DEFAULT_MAX_PART: usize = 64 * 1024 * 1024;

/// Default maximum number of parts in one message.
pub const DEFAULT_MAX_PARTS: usize = 16;

/// One decoded message part.
#[derive(Debug, Clone)]
pub struct Part {
    /// Whether more parts of the same message follow.
    pub more: bool,
    /// The part bytes.
    pub data: Bytes,
}

/// Encode a part into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬───────────┬─────────┬─────────────────┐
/// │ Magic (2B)   │ Length    │ Flags   │ Data             │
/// │ 0x46 0x52    │ (4B LE)  │ (1B)    │ (Length bytes)   │
/// │ "FR"         │          │         │                  │
/// └──────────────┴───────────┴─────────┴─────────────────┘
/// ```
pub fn encode_part(data: &[u8], more: bool, dst: &mut BytesMut) -> Result<()> {
    if data.len() > u32::MAX as usize {
        return Err(TransportError::PartTooLarge {
            size: data.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + data.len());
    dst.put_slice(&MAGIC);
    dst.put_u32_le(data.len() as u32);
    dst.put_u8(if more { FLAG_MORE } else { 0 });
    dst.put_slice(data);
    Ok(())
}

/// Encode a whole message, setting the more flag on all but the last part.
pub fn encode_message<P: AsRef<[u8]>>(parts: &[P], dst: &mut BytesMut) -> Result<()> {
    let last = parts.len().saturating_sub(1);
    for (index, part) in parts.iter().enumerate() {
        encode_part(part.as_ref(), index < last, dst)?;
    }
    Ok(())
}

/// Decode a part from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete part yet.
/// On success, consumes the part bytes from the buffer.
pub fn decode_part(src: &mut BytesMut, max_part: usize) -> Result<Option<Part>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(TransportError::InvalidMagic);
    }

    let len = u32::from_le_bytes([src[2], src[3], src[4], src[5]]) as usize;
    let flags = src[6];

    if len > max_part {
        return Err(TransportError::PartTooLarge {
            size: len,
            max: max_part,
        });
    }

    if src.len() < HEADER_SIZE + len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let data = src.split_to(len).freeze();

    Ok(Some(Part {
        more: flags & FLAG_MORE != 0,
        data,
    }))
}

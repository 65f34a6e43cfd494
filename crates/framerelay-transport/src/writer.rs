use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::error::{Result, TransportError};
use crate::wire::{encode_message, DEFAULT_MAX_PART};

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Writes complete multipart messages to any `Write` stream.
///
/// The whole message is encoded before the first byte is written, so a
/// message is never emitted partially because of an encoding failure.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    max_part_size: usize,
}

impl<T: Write> MessageWriter<T> {
    /// Create a new message writer with the default part size limit.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_part_size: DEFAULT_MAX_PART,
        }
    }

    /// Encode and send one message made of `parts`.
    pub fn send_message<P: AsRef<[u8]>>(&mut self, parts: &[P]) -> Result<()> {
        if let Some(part) = parts
            .iter()
            .find(|part| part.as_ref().len() > self.max_part_size)
        {
            return Err(TransportError::PartTooLarge {
                size: part.as_ref().len(),
                max: self.max_part_size,
            });
        }

        self.buf.clear();
        encode_message(parts, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(TransportError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    /// Update maximum part size for subsequent messages.
    pub fn set_max_part_size(&mut self, max_part_size: usize) {
        self.max_part_size = max_part_size;
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

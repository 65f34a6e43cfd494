use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::Multipart;
use crate::wire::{decode_part, DEFAULT_MAX_PART, DEFAULT_MAX_PARTS};

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Reads complete multipart messages from any `Read` stream.
///
/// Handles partial reads internally. Parts already received survive a
/// timed-out read, so the next call resumes the same message.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    pending: Vec<Bytes>,
    max_part_size: usize,
    max_parts: usize,
}

impl<T: Read> MessageReader<T> {
    /// Create a new message reader with the default part size limit.
    pub fn new(inner: T) -> Self {
        Self::with_max_part_size(inner, DEFAULT_MAX_PART)
    }

    /// Create a new message reader with an explicit part size limit.
    pub fn with_max_part_size(inner: T, max_part_size: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            pending: Vec::new(),
            max_part_size,
            max_parts: DEFAULT_MAX_PARTS,
        }
    }

    /// Limit the number of parts accepted in one message.
    pub fn with_max_parts(mut self, max_parts: usize) -> Self {
        self.max_parts = max_parts;
        self
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Err(TransportError::ConnectionClosed)` when EOF is reached and
    /// `Err(TransportError::TimedOut)` when the stream's read timeout elapses.
    pub fn read_message(&mut self) -> Result<Multipart> {
        loop {
            while let Some(part) = decode_part(&mut self.buf, self.max_part_size)? {
                self.pending.push(part.data);
                if !part.more {
                    return Ok(Multipart::new(std::mem::take(&mut self.pending)));
                }
                if self.pending.len() >= self.max_parts {
                    self.pending.clear();
                    return Err(TransportError::TooManyParts {
                        max: self.max_parts,
                    });
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Err(TransportError::TimedOut)
                }
                Err(err) => return Err(TransportError::Io(err)),
            };

            if read == 0 {
                return Err(TransportError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::wire::{encode_message, encode_part, MAGIC};

    #[test]
    fn read_two_part_message() {
        let mut wire = BytesMut::new();
        encode_message(&[&b"out"[..], &b"envelope"[..]], &mut wire).unwrap();

        let mut reader = MessageReader::new(Cursor::new(wire.to_vec()));
        let msg = reader.read_message().unwrap();

        assert_eq!(msg.len(), 2);
        assert_eq!(msg.topic_lossy(), "out");
        assert_eq!(msg.body().unwrap().as_ref(), b"envelope");
    }

    #[test]
    fn read_consecutive_messages() {
        let mut wire = BytesMut::new();
        encode_part(b"first", false, &mut wire).unwrap();
        encode_message(&[&b"a"[..], &b"b"[..], &b"c"[..]], &mut wire).unwrap();

        let mut reader = MessageReader::new(Cursor::new(wire.to_vec()));
        let first = reader.read_message().unwrap();
        let second = reader.read_message().unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 3);
        assert_eq!(second.parts()[2].as_ref(), b"c");
    }

    #[test]
    fn partial_read_handling() {
        let mut wire = BytesMut::new();
        encode_message(&[&b"out"[..], &b"slow"[..]], &mut wire).unwrap();

        let mut reader = MessageReader::new(ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        });
        let msg = reader.read_message().unwrap();
        assert_eq!(msg.body().unwrap().as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_mid_message() {
        let mut wire = BytesMut::new();
        encode_part(b"out", true, &mut wire).unwrap();
        wire.put_slice(&MAGIC);
        wire.put_u32_le(16);
        wire.put_u8(0);
        wire.put_slice(b"only-part");

        let mut reader = MessageReader::new(Cursor::new(wire.to_vec()));
        assert!(matches!(
            reader.read_message(),
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[test]
    fn oversized_part_in_stream() {
        let mut wire = BytesMut::new();
        encode_part(&[0u8; 64], false, &mut wire).unwrap();

        let mut reader = MessageReader::with_max_part_size(Cursor::new(wire.to_vec()), 16);
        assert!(matches!(
            reader.read_message(),
            Err(TransportError::PartTooLarge { size: 64, max: 16 })
        ));
    }

    #[test]
    fn endless_more_flag_hits_part_limit() {
        let mut wire = BytesMut::new();
        for _ in 0..10 {
            encode_part(b"x", true, &mut wire).unwrap();
        }

        let mut reader = MessageReader::new(Cursor::new(wire.to_vec())).with_max_parts(4);
        assert!(matches!(
            reader.read_message(),
            Err(TransportError::TooManyParts { max: 4 })
        ));
    }

    #[test]
    fn message_at_part_limit_is_accepted() {
        let mut wire = BytesMut::new();
        encode_message(&[&b"a"[..], &b"b"[..], &b"c"[..], &b"d"[..]], &mut wire).unwrap();

        let mut reader = MessageReader::new(Cursor::new(wire.to_vec())).with_max_parts(4);
        assert_eq!(reader.read_message().unwrap().len(), 4);
    }

    #[test]
    fn would_block_reports_timeout_and_resumes() {
        let mut wire = BytesMut::new();
        encode_message(&[&b"out"[..], &b"later"[..]], &mut wire).unwrap();
        let split = 10;

        let mut reader = MessageReader::new(StallOnce {
            bytes: wire.to_vec(),
            pos: 0,
            stall_at: split,
            stalled: false,
        });

        assert!(matches!(
            reader.read_message(),
            Err(TransportError::TimedOut)
        ));
        let msg = reader.read_message().unwrap();
        assert_eq!(msg.topic_lossy(), "out");
        assert_eq!(msg.body().unwrap().as_ref(), b"later");
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::MessageWriter::new(left);
        let mut reader = MessageReader::new(right);

        writer.send_message(&[&b"out"[..], &b"ping"[..]]).unwrap();
        let msg = reader.read_message().unwrap();
        assert_eq!(msg.body().unwrap().as_ref(), b"ping");
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct StallOnce {
        bytes: Vec<u8>,
        pos: usize,
        stall_at: usize,
        stalled: bool,
    }

    impl Read for StallOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == self.stall_at && !self.stalled {
                self.stalled = true;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let end = if self.stalled {
                self.bytes.len()
            } else {
                self.stall_at
            };
            let n = (end - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}

use bytes::{BufMut, Bytes, BytesMut};
use rmp::decode::{read_array_len, read_bin_len, read_f32, read_f64, read_int, read_str_len};
use rmp::encode::{
    write_array_len, write_bin, write_f64, write_sint, write_str, write_uint, ValueWriteError,
};
use rmp::Marker;

use crate::envelope::{Envelope, Field, FormatSize, Timestamp};
use crate::error::{EnvelopeError, Result};

/// Default maximum payload size: 64 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

/// Configuration for the envelope codec.
#[derive(Debug, Clone)]
pub struct EnvelopeConfig {
    /// Largest payload a decoder accepts. Default: 64 MiB.
    pub max_payload_size: usize,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// Decode a six-value inbound envelope.
///
/// Values are read one at a time in wire order. The payload is a zero-copy
/// slice of `src`; its length prefix is checked against the remaining bytes
/// and the configured maximum before anything is sliced. Bytes after the
/// payload are ignored.
pub fn decode_envelope(src: &Bytes, config: &EnvelopeConfig) -> Result<Envelope> {
    decode_values(src, config, false)
}

/// Decode a seven-value outbound envelope (with `meta` before the payload).
pub fn decode_annotated(src: &Bytes, config: &EnvelopeConfig) -> Result<Envelope> {
    decode_values(src, config, true)
}

fn decode_values(src: &Bytes, config: &EnvelopeConfig, with_meta: bool) -> Result<Envelope> {
    let mut rd = ValueReader::new(src);

    let source = rd.read_string(Field::Source)?;
    let timestamp = rd.read_timestamp()?;
    let kind = rd.read_string(Field::Kind)?;
    let format = rd.read_string(Field::Format)?;
    let format_size = rd.read_format_size()?;
    let meta = if with_meta {
        Some(rd.read_string(Field::Meta)?)
    } else {
        None
    };
    let payload = rd.read_payload(config.max_payload_size)?;

    Ok(Envelope {
        source,
        timestamp,
        kind,
        format,
        format_size,
        meta,
        payload,
    })
}

/// Encode an envelope into the wire format.
///
/// Writes six values, or seven when `meta` is set. The full envelope is
/// appended to `dst` so one send carries one complete frame.
pub fn encode_envelope(envelope: &Envelope, dst: &mut BytesMut) -> Result<()> {
    if envelope.payload.len() > u32::MAX as usize {
        return Err(EnvelopeError::PayloadTooLarge {
            size: envelope.payload.len(),
            max: u32::MAX as usize,
        });
    }

    dst.reserve(envelope.payload.len() + 64);
    let mut wr = (&mut *dst).writer();

    write_str(&mut wr, &envelope.source).map_err(encode_error)?;
    match envelope.timestamp {
        Timestamp::Unsigned(v) => write_uint(&mut wr, v).map(drop),
        Timestamp::Signed(v) => write_sint(&mut wr, v).map(drop),
        Timestamp::Float(v) => write_f64(&mut wr, v),
    }
    .map_err(encode_error)?;
    write_str(&mut wr, &envelope.kind).map_err(encode_error)?;
    write_str(&mut wr, &envelope.format).map_err(encode_error)?;
    write_array_len(&mut wr, 3).map_err(encode_error)?;
    for dim in envelope.format_size.to_array() {
        write_uint(&mut wr, u64::from(dim)).map_err(encode_error)?;
    }
    if let Some(meta) = &envelope.meta {
        write_str(&mut wr, meta).map_err(encode_error)?;
    }
    write_bin(&mut wr, &envelope.payload).map_err(encode_error)?;

    Ok(())
}

impl Envelope {
    /// Encode into a freshly allocated buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        encode_envelope(self, &mut buf)?;
        Ok(buf.freeze())
    }
}

fn encode_error(err: ValueWriteError<std::io::Error>) -> EnvelopeError {
    EnvelopeError::Encode(err.to_string())
}

/// Positional reader over one envelope buffer.
struct ValueReader<'a> {
    src: &'a Bytes,
    rest: &'a [u8],
}

impl<'a> ValueReader<'a> {
    fn new(src: &'a Bytes) -> Self {
        Self {
            src,
            rest: src.as_ref(),
        }
    }

    fn offset(&self) -> usize {
        self.src.len() - self.rest.len()
    }

    fn take(&mut self, field: Field, len: usize) -> Result<&'a [u8]> {
        if len > self.rest.len() {
            return Err(EnvelopeError::Truncated {
                field,
                needed: len,
                available: self.rest.len(),
            });
        }
        let rest: &'a [u8] = self.rest;
        let (head, tail) = rest.split_at(len);
        self.rest = tail;
        Ok(head)
    }

    fn read_string(&mut self, field: Field) -> Result<String> {
        let len = read_str_len(&mut self.rest).map_err(|e| EnvelopeError::malformed(field, e))?;
        let bytes = self.take(field, len as usize)?;
        let text = std::str::from_utf8(bytes).map_err(|e| EnvelopeError::malformed(field, e))?;
        Ok(text.to_owned())
    }

    fn read_timestamp(&mut self) -> Result<Timestamp> {
        let field = Field::Timestamp;
        let Some(&first) = self.rest.first() else {
            return Err(EnvelopeError::malformed(field, "missing value"));
        };

        match Marker::from_u8(first) {
            Marker::FixPos(_) | Marker::U8 | Marker::U16 | Marker::U32 | Marker::U64 => {
                read_int(&mut self.rest)
                    .map(Timestamp::Unsigned)
                    .map_err(|e| EnvelopeError::malformed(field, e))
            }
            Marker::FixNeg(_) | Marker::I8 | Marker::I16 | Marker::I32 | Marker::I64 => {
                read_int(&mut self.rest)
                    .map(Timestamp::Signed)
                    .map_err(|e| EnvelopeError::malformed(field, e))
            }
            Marker::F32 => read_f32(&mut self.rest)
                .map(|v| Timestamp::Float(f64::from(v)))
                .map_err(|e| EnvelopeError::malformed(field, e)),
            Marker::F64 => read_f64(&mut self.rest)
                .map(Timestamp::Float)
                .map_err(|e| EnvelopeError::malformed(field, e)),
            other => Err(EnvelopeError::malformed(
                field,
                format!("expected a number, found marker {other:?}"),
            )),
        }
    }

    fn read_format_size(&mut self) -> Result<FormatSize> {
        let field = Field::FormatSize;
        let len = read_array_len(&mut self.rest).map_err(|e| EnvelopeError::malformed(field, e))?;
        if len != 3 {
            return Err(EnvelopeError::malformed(
                field,
                format!("expected 3 elements, found {len}"),
            ));
        }

        let mut dims = [0u32; 3];
        for dim in &mut dims {
            *dim = read_int(&mut self.rest).map_err(|e| EnvelopeError::malformed(field, e))?;
        }
        Ok(FormatSize::from(dims))
    }

    fn read_payload(&mut self, max_payload: usize) -> Result<Bytes> {
        let field = Field::Payload;
        let len = read_bin_len(&mut self.rest).map_err(|e| EnvelopeError::malformed(field, e))?
            as usize;
        if len > max_payload {
            return Err(EnvelopeError::PayloadTooLarge {
                size: len,
                max: max_payload,
            });
        }

        let start = self.offset();
        self.take(field, len)?;
        Ok(self.src.slice(start..start + len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `cam1`, 1000, `image`, `RGBA`, [2, 1, 24], six payload bytes, as
    /// written by a stock MessagePack packer.
    const INBOUND_WIRE: &[u8] = &[
        0xa4, b'c', b'a', b'm', b'1', // source
        0xcd, 0x03, 0xe8, // timestamp
        0xa5, b'i', b'm', b'a', b'g', b'e', // kind
        0xa4, b'R', b'G', b'B', b'A', // format
        0x93, 0x02, 0x01, 0x18, // format_size
        0xc4, 0x06, 1, 2, 3, 4, 5, 6, // payload
    ];

    fn sample() -> Envelope {
        Envelope::new(
            "cam1",
            1000u64,
            "image",
            "RGBA",
            FormatSize::new(2, 1, 24),
            vec![1u8, 2, 3, 4, 5, 6],
        )
    }

    fn decode(bytes: &[u8]) -> Result<Envelope> {
        decode_envelope(&Bytes::copy_from_slice(bytes), &EnvelopeConfig::default())
    }

    #[test]
    fn decodes_packer_output() {
        let envelope = decode(INBOUND_WIRE).unwrap();
        assert_eq!(envelope, sample());
        assert_eq!(envelope.value_count(), 6);
    }

    #[test]
    fn encodes_compact_packer_layout() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(bytes.as_ref(), INBOUND_WIRE);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let original = Envelope::new(
            "SENSOR_FRONT",
            Timestamp::Signed(-42),
            "raw",
            "SENSOR_IMAGE_YUV422_8BPP_V2",
            FormatSize::new(640, 480, 16),
            vec![0x80; 640 * 480 * 2],
        );
        let decoded = decode(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn float_timestamp_roundtrip() {
        let mut original = sample();
        original.timestamp = Timestamp::Float(1_652_000_000.25);
        let decoded = decode(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.timestamp, Timestamp::Float(1_652_000_000.25));
    }

    #[test]
    fn large_unsigned_timestamp_survives() {
        let mut original = sample();
        original.timestamp = Timestamp::Unsigned(u64::MAX);
        let decoded = decode(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.timestamp, Timestamp::Unsigned(u64::MAX));
    }

    #[test]
    fn annotated_roundtrip_places_meta_before_payload() {
        let original = sample().with_meta("{detections: 3}");
        let bytes = original.to_bytes().unwrap();

        let decoded = decode_annotated(&bytes, &EnvelopeConfig::default()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.value_count(), 7);

        // A plain decoder expects bin where meta sits.
        assert!(matches!(
            decode(&bytes),
            Err(EnvelopeError::Malformed {
                field: Field::Payload,
                ..
            })
        ));
    }

    #[test]
    fn payload_is_a_slice_of_the_input() {
        let src = Bytes::copy_from_slice(INBOUND_WIRE);
        let envelope = decode_envelope(&src, &EnvelopeConfig::default()).unwrap();
        let start = INBOUND_WIRE.len() - 6;
        assert_eq!(envelope.payload.as_ptr(), src[start..].as_ptr());
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = INBOUND_WIRE.to_vec();
        bytes.extend_from_slice(&[0xa3, b'x', b'y', b'z']);
        assert_eq!(decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn fewer_than_six_values_is_malformed() {
        for cut in [0, 5, 8, 14, 19, 23] {
            let result = decode(&INBOUND_WIRE[..cut]);
            assert!(
                matches!(result, Err(EnvelopeError::Malformed { .. })),
                "cut at {cut} gave {result:?}"
            );
        }
    }

    #[test]
    fn format_size_with_wrong_arity_is_malformed() {
        let mut bytes = INBOUND_WIRE[..19].to_vec();
        bytes.extend_from_slice(&[0x92, 0x02, 0x01]);
        bytes.extend_from_slice(&INBOUND_WIRE[23..]);

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Malformed {
                field: Field::FormatSize,
                ..
            }
        ));
    }

    #[test]
    fn negative_dimension_is_malformed() {
        let mut bytes = INBOUND_WIRE.to_vec();
        bytes[20] = 0xff; // fixneg -1 as width
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Malformed {
                field: Field::FormatSize,
                ..
            }
        ));
    }

    #[test]
    fn wrong_value_type_is_malformed() {
        let mut bytes = INBOUND_WIRE.to_vec();
        bytes[5] = 0xc0; // nil timestamp
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Malformed {
                field: Field::Timestamp,
                ..
            }
        ));
    }

    #[test]
    fn truncated_payload_is_rejected_without_copying() {
        let bytes = &INBOUND_WIRE[..INBOUND_WIRE.len() - 2];
        let err = decode(bytes).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Truncated {
                field: Field::Payload,
                needed: 6,
                available: 4,
            }
        ));
    }

    #[test]
    fn huge_declared_payload_is_rejected_by_limit() {
        let mut bytes = INBOUND_WIRE[..23].to_vec();
        bytes.extend_from_slice(&[0xc6, 0x7f, 0xff, 0xff, 0xff]); // bin32, 2 GiB
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, EnvelopeError::PayloadTooLarge { .. }));
    }

    #[test]
    fn invalid_utf8_string_is_malformed() {
        let mut bytes = INBOUND_WIRE.to_vec();
        bytes[1] = 0xff;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Malformed {
                field: Field::Source,
                ..
            }
        ));
    }

    #[test]
    fn empty_payload() {
        let mut original = sample();
        original.payload = Bytes::new();
        let decoded = decode(&original.to_bytes().unwrap()).unwrap();
        assert!(decoded.payload.is_empty());
    }
}

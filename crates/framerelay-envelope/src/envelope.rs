use std::fmt;

use bytes::Bytes;

/// Position of a value inside an envelope, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Source,
    Timestamp,
    Kind,
    Format,
    FormatSize,
    Meta,
    Payload,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Source => "source",
            Field::Timestamp => "timestamp",
            Field::Kind => "kind",
            Field::Format => "format",
            Field::FormatSize => "format_size",
            Field::Meta => "meta",
            Field::Payload => "payload",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capture time, passed through without interpretation.
///
/// Re-encoded with the same numeric kind it was decoded with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timestamp {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Unsigned(v) => write!(f, "{v}"),
            Timestamp::Signed(v) => write!(f, "{v}"),
            Timestamp::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Timestamp::Unsigned(value)
    }
}

/// The `[width, height, bits_per_pixel]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatSize {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
}

impl FormatSize {
    pub fn new(width: u32, height: u32, bits_per_pixel: u32) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
        }
    }

    /// Same dimensions with a different bit depth.
    pub fn with_bits_per_pixel(self, bits_per_pixel: u32) -> Self {
        Self {
            bits_per_pixel,
            ..self
        }
    }

    pub fn to_array(self) -> [u32; 3] {
        [self.width, self.height, self.bits_per_pixel]
    }
}

impl From<[u32; 3]> for FormatSize {
    fn from([width, height, bits_per_pixel]: [u32; 3]) -> Self {
        Self::new(width, height, bits_per_pixel)
    }
}

impl fmt::Display for FormatSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}]",
            self.width, self.height, self.bits_per_pixel
        )
    }
}

/// One tagged frame: header fields plus a raw payload.
///
/// `meta` is only present on outbound (annotated) envelopes.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub source: String,
    pub timestamp: Timestamp,
    pub kind: String,
    pub format: String,
    pub format_size: FormatSize,
    pub meta: Option<String>,
    pub payload: Bytes,
}

impl Envelope {
    /// Create an envelope without meta annotation.
    pub fn new(
        source: impl Into<String>,
        timestamp: impl Into<Timestamp>,
        kind: impl Into<String>,
        format: impl Into<String>,
        format_size: FormatSize,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            source: source.into(),
            timestamp: timestamp.into(),
            kind: kind.into(),
            format: format.into(),
            format_size,
            meta: None,
            payload: payload.into(),
        }
    }

    /// Attach a meta annotation, turning this into a seven-value envelope.
    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Number of values this envelope occupies on the wire.
    pub fn value_count(&self) -> usize {
        if self.meta.is_some() {
            7
        } else {
            6
        }
    }
}

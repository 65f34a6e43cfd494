use framerelay_envelope::FormatSize;

/// Errors that can occur while normalizing a frame.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The payload length does not match the declared dimensions.
    #[error("size mismatch: {declared} declares {expected} bytes, payload has {actual}")]
    SizeMismatch {
        declared: FormatSize,
        expected: usize,
        actual: usize,
    },

    /// The declared bit depth is not a whole number of 8-bit samples.
    #[error("unsupported bit depth: {0} bits per pixel")]
    UnsupportedBitDepth(u32),

    /// The layout cannot convert a buffer with this many channels.
    #[error("{layout} cannot convert {channels}-channel pixels")]
    UnsupportedChannels { layout: &'static str, channels: usize },

    /// Packed 4:2:2 data needs an even width.
    #[error("4:2:2 frame width must be even, got {0}")]
    OddWidth(usize),

    /// `width * height * bytes_per_pixel` does not fit in memory.
    #[error("frame dimensions overflow: {0}")]
    DimensionOverflow(FormatSize),
}

pub type Result<T> = std::result::Result<T, NormalizeError>;

use framerelay_envelope::FormatSize;

use crate::error::{NormalizeError, Result};
use crate::registry::LayoutDescriptor;

/// Bit depth of every canonical frame.
pub const CANONICAL_BITS_PER_PIXEL: u32 = 32;

/// A validated payload viewed as `height x width x channels` 8-bit samples.
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'a> {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: &'a [u8],
}

/// Dense row-major 8-bit RGBA frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl CanonicalFrame {
    /// `[width, height, 32]`.
    pub fn format_size(&self) -> FormatSize {
        FormatSize::new(self.width, self.height, CANONICAL_BITS_PER_PIXEL)
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Consume the frame, returning its samples in the order `descriptor`
    /// sends downstream.
    pub fn into_output(mut self, descriptor: &LayoutDescriptor) -> Vec<u8> {
        (descriptor.emit)(&mut self.data);
        self.data
    }
}

/// Payload length implied by `[width, height, bpp]`.
///
/// The bit depth must be a non-zero multiple of 8.
pub fn expected_payload_len(size: FormatSize) -> Result<usize> {
    Ok(checked_len(size)?.0)
}

fn checked_len(size: FormatSize) -> Result<(usize, usize)> {
    if size.bits_per_pixel == 0 || size.bits_per_pixel % 8 != 0 {
        return Err(NormalizeError::UnsupportedBitDepth(size.bits_per_pixel));
    }
    let channels = (size.bits_per_pixel / 8) as usize;
    let len = (size.width as usize)
        .checked_mul(size.height as usize)
        .and_then(|pixels| pixels.checked_mul(channels))
        .ok_or(NormalizeError::DimensionOverflow(size))?;
    Ok((len, channels))
}

/// Validate `payload` against `size` and convert it to canonical RGBA.
///
/// The declared bit depth, not the descriptor's nominal one, decides the
/// expected length and the channel count handed to the conversion.
pub fn normalize(
    descriptor: &LayoutDescriptor,
    size: FormatSize,
    payload: &[u8],
) -> Result<CanonicalFrame> {
    let (expected, channels) = checked_len(size)?;
    if payload.len() != expected {
        return Err(NormalizeError::SizeMismatch {
            declared: size,
            expected,
            actual: payload.len(),
        });
    }

    let view = PixelView {
        width: size.width as usize,
        height: size.height as usize,
        channels,
        data: payload,
    };
    let data = (descriptor.convert)(&view)?;
    tracing::trace!(
        layout = descriptor.name,
        width = size.width,
        height = size.height,
        channels,
        "normalized frame"
    );

    Ok(CanonicalFrame {
        width: size.width,
        height: size.height,
        data,
    })
}

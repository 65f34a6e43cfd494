//! Pixel layout registry and frame normalization.
//!
//! A [`LayoutRegistry`] maps an envelope's `(kind, format)` tags to a
//! [`LayoutDescriptor`]. [`normalize`] checks the payload size against the
//! declared `[width, height, bpp]` and runs the descriptor's conversion,
//! producing a dense 8-bit RGBA [`CanonicalFrame`]. The descriptor's emit
//! step puts the canonical samples into the order sent downstream.

pub mod convert;
pub mod error;
pub mod normalize;
pub mod registry;

pub use error::{NormalizeError, Result};
pub use normalize::{
    expected_payload_len, normalize, CanonicalFrame, PixelView, CANONICAL_BITS_PER_PIXEL,
};
pub use registry::{
    ConvertFn, EmitFn, FormatMatch, LayoutDescriptor, LayoutRegistry, PixelLayout,
};

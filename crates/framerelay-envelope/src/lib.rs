//! Positional MessagePack envelope codec.
//!
//! An envelope is a fixed sequence of MessagePack values written back to
//! back, with no enclosing array and no schema tag:
//!
//! ```text
//! source (str) | timestamp (int/float) | kind (str) | format (str)
//!   | format_size ([width, height, bpp]) | [meta (str)] | payload (bin)
//! ```
//!
//! Inbound envelopes carry six values. Outbound envelopes insert `meta`
//! before the payload. Position alone determines meaning.

pub mod codec;
pub mod envelope;
pub mod error;

pub use codec::{
    decode_annotated, decode_envelope, encode_envelope, EnvelopeConfig, DEFAULT_MAX_PAYLOAD,
};
pub use envelope::{Envelope, Field, FormatSize, Timestamp};
pub use error::{EnvelopeError, Result};

//! Relay tagged sensor frames from a pub/sub bus to a push channel.
//!
//! Frames arrive as positional MessagePack envelopes. Images in a known
//! layout are normalized to 8-bit RGBA and forwarded; everything else is
//! skipped.
//!
//! # Crate Structure
//!
//! - [`transport`]: pub/sub and push/pull transports (Unix sockets, ZeroMQ)
//! - [`envelope`]: the envelope codec
//! - [`pixel`]: pixel layout registry and RGBA normalization
//! - [`relay`]: the relay loop

/// Re-export transport types.
pub mod transport {
    pub use framerelay_transport::*;
}

/// Re-export envelope codec types.
pub mod envelope {
    pub use framerelay_envelope::*;
}

/// Re-export pixel normalization types.
pub mod pixel {
    pub use framerelay_pixel::*;
}

/// Re-export relay loop types.
pub mod relay {
    pub use framerelay_relay::*;
}

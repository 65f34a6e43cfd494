//! The frame relay loop.
//!
//! Pull one `[topic, envelope]` message from a [`Subscriber`], normalize the
//! image it carries to RGBA, and push the re-encoded envelope to a
//! [`Pusher`]. Frames that cannot be understood are skipped and counted;
//! only transport and encode failures stop the loop.
//!
//! [`Subscriber`]: framerelay_transport::Subscriber
//! [`Pusher`]: framerelay_transport::Pusher

pub mod config;
pub mod error;
pub mod relay;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use relay::{process_envelope, FrameDisposition, Relay, RelayStats, SkipReason, StepOutcome};

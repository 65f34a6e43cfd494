//! Message transports for framerelay.
//!
//! The relay core only sees four narrow traits:
//! - [`Subscriber`] receives `[topic, body]` multipart messages from a pub/sub bus
//! - [`Pusher`] sends one opaque buffer per call on a push channel
//! - [`Publisher`] and [`Puller`] are the opposite ends, used by the
//!   producer and sink tools
//!
//! Two backends implement them: a local Unix-socket transport (always built
//! on Unix) and ZeroMQ (feature `zmq`). Pick one with an [`Endpoint`].

pub mod endpoint;
pub mod error;
pub mod reader;
pub mod traits;
pub mod wire;
pub mod writer;

#[cfg(unix)]
pub mod uds;

#[cfg(feature = "zmq")]
pub mod zeromq;

pub use endpoint::{Endpoint, PUSH_BASE_PORT, SUBSCRIBE_BASE_PORT};
pub use error::{Result, TransportError};
pub use reader::MessageReader;
pub use traits::{Multipart, Publisher, Puller, Pusher, Subscriber};
pub use writer::MessageWriter;

#[cfg(unix)]
pub use uds::{UnixDomainSocket, UnixPublisher, UnixPuller, UnixPusher, UnixSubscriber};

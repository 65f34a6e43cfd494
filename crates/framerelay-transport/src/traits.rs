use bytes::Bytes;

use crate::error::Result;

/// One message received from a pub/sub bus: an ordered list of parts.
///
/// By convention the first part is the topic and the second part is the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    parts: Vec<Bytes>,
}

impl Multipart {
    /// Create a message from its parts.
    pub fn new(parts: Vec<Bytes>) -> Self {
        Self { parts }
    }

    /// Build a two-part `[topic, body]` message.
    pub fn topic_and_body(topic: impl Into<Bytes>, body: impl Into<Bytes>) -> Self {
        Self {
            parts: vec![topic.into(), body.into()],
        }
    }

    /// The first part, if any.
    pub fn topic(&self) -> Option<&Bytes> {
        self.parts.first()
    }

    /// The first part decoded as UTF-8 (lossy), for logging.
    pub fn topic_lossy(&self) -> String {
        self.topic()
            .map(|topic| String::from_utf8_lossy(topic).into_owned())
            .unwrap_or_default()
    }

    /// The second part, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.parts.get(1)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Bytes> {
        self.parts
    }
}

/// Receiving side of a pub/sub subscription.
///
/// The topic filter is fixed when the subscriber is constructed.
pub trait Subscriber {
    /// Block until the next message matching the subscription arrives.
    ///
    /// Returns `TransportError::TimedOut` when a receive poll interval is
    /// configured and elapses without a message.
    fn recv_multipart(&mut self) -> Result<Multipart>;
}

/// Sending side of a push channel: one opaque buffer per call.
pub trait Pusher {
    /// Send one complete buffer as a single message.
    fn send(&mut self, buf: &[u8]) -> Result<()>;
}

/// Publishing side of a pub/sub bus.
pub trait Publisher {
    /// Publish a `[topic, body]` message.
    fn publish(&mut self, topic: &[u8], body: &[u8]) -> Result<()>;
}

/// Receiving side of a push channel.
pub trait Puller {
    /// Block until the next single-part message arrives.
    fn recv(&mut self) -> Result<Bytes>;
}

impl<T: Subscriber + ?Sized> Subscriber for Box<T> {
    fn recv_multipart(&mut self) -> Result<Multipart> {
        (**self).recv_multipart()
    }
}

impl<T: Pusher + ?Sized> Pusher for Box<T> {
    fn send(&mut self, buf: &[u8]) -> Result<()> {
        (**self).send(buf)
    }
}

impl<T: Publisher + ?Sized> Publisher for Box<T> {
    fn publish(&mut self, topic: &[u8], body: &[u8]) -> Result<()> {
        (**self).publish(topic, body)
    }
}

impl<T: Puller + ?Sized> Puller for Box<T> {
    fn recv(&mut self) -> Result<Bytes> {
        (**self).recv()
    }
}

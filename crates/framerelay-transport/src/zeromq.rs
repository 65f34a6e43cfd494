//! ZeroMQ backend (feature `zmq`).
//!
//! Socket handles are owned by the wrapper types and closed on drop; the
//! context is reference-counted by the `zmq` crate and terminates once the
//! last socket is gone.

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{Multipart, Publisher, Puller, Pusher, Subscriber};

/// Outbound high-water mark, in messages.
const SEND_HIGH_WATER_MARK: i32 = 3;

fn poll_millis(poll: Option<Duration>) -> i32 {
    match poll {
        Some(poll) => i32::try_from(poll.as_millis()).unwrap_or(i32::MAX).max(1),
        None => -1,
    }
}

fn map_recv_error(err: zmq::Error) -> TransportError {
    match err {
        zmq::Error::EAGAIN => TransportError::TimedOut,
        other => TransportError::Zmq(other),
    }
}

/// SUB socket connected to a publisher.
pub struct ZmqSubscriber {
    socket: zmq::Socket,
}

impl ZmqSubscriber {
    pub fn connect(addr: &str, topic: &[u8], poll: Option<Duration>) -> Result<Self> {
        let socket = zmq::Context::new().socket(zmq::SUB)?;
        socket.set_rcvtimeo(poll_millis(poll))?;
        socket.connect(addr)?;
        socket.set_subscribe(topic)?;
        info!(addr, topic = %String::from_utf8_lossy(topic), "subscribed");
        Ok(Self { socket })
    }
}

impl Subscriber for ZmqSubscriber {
    fn recv_multipart(&mut self) -> Result<Multipart> {
        let parts = self.socket.recv_multipart(0).map_err(map_recv_error)?;
        Ok(Multipart::new(parts.into_iter().map(Bytes::from).collect()))
    }
}

/// PUSH socket connected to a puller.
pub struct ZmqPusher {
    socket: zmq::Socket,
}

impl ZmqPusher {
    pub fn connect(addr: &str) -> Result<Self> {
        let socket = zmq::Context::new().socket(zmq::PUSH)?;
        socket.set_linger(0)?;
        socket.connect(addr)?;
        info!(addr, "push socket connected");
        Ok(Self { socket })
    }
}

impl Pusher for ZmqPusher {
    fn send(&mut self, buf: &[u8]) -> Result<()> {
        self.socket.send(buf, 0)?;
        Ok(())
    }
}

/// PUB socket bound for subscribers.
pub struct ZmqPublisher {
    socket: zmq::Socket,
}

impl ZmqPublisher {
    pub fn bind(addr: &str) -> Result<Self> {
        let socket = zmq::Context::new().socket(zmq::PUB)?;
        socket.set_sndhwm(SEND_HIGH_WATER_MARK)?;
        socket.bind(addr)?;
        info!(addr, "publisher bound");
        Ok(Self { socket })
    }
}

impl Publisher for ZmqPublisher {
    fn publish(&mut self, topic: &[u8], body: &[u8]) -> Result<()> {
        self.socket.send(topic, zmq::SNDMORE)?;
        self.socket.send(body, 0)?;
        debug!(size = body.len(), "published");
        Ok(())
    }
}

/// PULL socket bound for pushers.
pub struct ZmqPuller {
    socket: zmq::Socket,
}

impl ZmqPuller {
    pub fn bind(addr: &str, poll: Option<Duration>) -> Result<Self> {
        let socket = zmq::Context::new().socket(zmq::PULL)?;
        socket.set_linger(0)?;
        socket.set_rcvtimeo(poll_millis(poll))?;
        socket.bind(addr)?;
        info!(addr, "pull socket bound");
        Ok(Self { socket })
    }
}

impl Puller for ZmqPuller {
    fn recv(&mut self) -> Result<Bytes> {
        let data = self.socket.recv_bytes(0).map_err(map_recv_error)?;
        Ok(Bytes::from(data))
    }
}

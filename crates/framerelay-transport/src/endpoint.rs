use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::traits::{Publisher, Puller, Pusher, Subscriber};

/// Base port of the inbound pub/sub channels (`5770 + channel`).
pub const SUBSCRIBE_BASE_PORT: u16 = 5770;

/// Base port of the outbound push channels (`5870 + channel`).
pub const PUSH_BASE_PORT: u16 = 5870;

/// Where a transport connects or binds.
///
/// Written as `tcp://host:port` (also `ipc://` and `inproc://`) for the
/// ZeroMQ backend, or `unix:/path/to/socket` for the local transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// ZeroMQ address, kept verbatim.
    Zmq(String),
    /// Local Unix domain socket path.
    Unix(PathBuf),
}

#[allow(unreachable_patterns)]
impl Endpoint {
    /// The inbound subscriber endpoint for a bus host and channel number.
    pub fn subscribe_channel(host: &str, channel: u16) -> Self {
        Endpoint::Zmq(format!(
            "tcp://{host}:{}",
            SUBSCRIBE_BASE_PORT.saturating_add(channel)
        ))
    }

    /// The outbound push endpoint for a bus host and channel number.
    pub fn push_channel(host: &str, channel: u16) -> Self {
        Endpoint::Zmq(format!(
            "tcp://{host}:{}",
            PUSH_BASE_PORT.saturating_add(channel)
        ))
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Endpoint::Zmq(_) => "zeromq",
            Endpoint::Unix(_) => "unix-domain-socket",
        }
    }

    /// Connect a subscriber filtered on `topic` (prefix match).
    pub fn connect_subscriber(
        &self,
        topic: &[u8],
        poll: Option<Duration>,
    ) -> Result<Box<dyn Subscriber>> {
        match self {
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Box::new(crate::uds::UnixSubscriber::connect(
                path, topic, poll,
            )?)),
            #[cfg(feature = "zmq")]
            Endpoint::Zmq(addr) => Ok(Box::new(crate::zeromq::ZmqSubscriber::connect(
                addr, topic, poll,
            )?)),
            other => Err(unsupported(other)),
        }
    }

    /// Connect a push sender.
    pub fn connect_pusher(&self) -> Result<Box<dyn Pusher>> {
        match self {
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Box::new(crate::uds::UnixPusher::connect(path)?)),
            #[cfg(feature = "zmq")]
            Endpoint::Zmq(addr) => Ok(Box::new(crate::zeromq::ZmqPusher::connect(addr)?)),
            other => Err(unsupported(other)),
        }
    }

    /// Bind a publisher.
    pub fn bind_publisher(&self) -> Result<Box<dyn Publisher>> {
        match self {
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Box::new(crate::uds::UnixPublisher::bind(path)?)),
            #[cfg(feature = "zmq")]
            Endpoint::Zmq(addr) => Ok(Box::new(crate::zeromq::ZmqPublisher::bind(addr)?)),
            other => Err(unsupported(other)),
        }
    }

    /// Bind a pull receiver.
    pub fn bind_puller(&self, poll: Option<Duration>) -> Result<Box<dyn Puller>> {
        match self {
            #[cfg(unix)]
            Endpoint::Unix(path) => Ok(Box::new(crate::uds::UnixPuller::bind(path, poll)?)),
            #[cfg(feature = "zmq")]
            Endpoint::Zmq(addr) => Ok(Box::new(crate::zeromq::ZmqPuller::bind(addr, poll)?)),
            other => Err(unsupported(other)),
        }
    }
}

#[allow(dead_code)]
fn unsupported(endpoint: &Endpoint) -> TransportError {
    match endpoint {
        Endpoint::Zmq(addr) => TransportError::Unsupported(format!(
            "{addr}: built without the `zmq` feature; use a unix: endpoint or rebuild with --features zmq"
        )),
        Endpoint::Unix(path) => TransportError::Unsupported(format!(
            "{}: unix domain sockets are not available on this platform",
            path.display()
        )),
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix:") {
            let path = path.strip_prefix("//").unwrap_or(path);
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(s.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }

        for scheme in ["tcp://", "ipc://", "inproc://"] {
            if let Some(rest) = s.strip_prefix(scheme) {
                if rest.is_empty() {
                    return Err(TransportError::InvalidEndpoint(s.to_string()));
                }
                return Ok(Endpoint::Zmq(s.to_string()));
            }
        }

        Err(TransportError::InvalidEndpoint(s.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Zmq(addr) => f.write_str(addr),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

use std::path::PathBuf;

/// Errors that can occur in message transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to connect to the specified address.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The endpoint string could not be parsed.
    #[error("invalid endpoint {0:?} (expected tcp://host:port or unix:/path)")]
    InvalidEndpoint(String),

    /// A message part header contains an invalid magic number.
    #[error("invalid part magic (expected 0x4652 \"FR\")")]
    InvalidMagic,

    /// A message part exceeds the configured maximum size.
    #[error("message part too large ({size} bytes, max {max})")]
    PartTooLarge { size: usize, max: usize },

    /// A message keeps announcing more parts past the configured limit.
    #[error("too many message parts (max {max})")]
    TooManyParts { max: usize },

    /// The peer closed the connection before a complete message arrived.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,

    /// No message arrived within the receive poll interval.
    #[error("receive poll interval elapsed")]
    TimedOut,

    /// The endpoint kind is not available in this build or on this platform.
    #[error("unsupported transport: {0}")]
    Unsupported(String),

    /// ZeroMQ reported an error.
    #[cfg(feature = "zmq")]
    #[error("zeromq error: {0}")]
    Zmq(#[from] zmq::Error),
}

impl TransportError {
    /// True when the error only signals an idle poll interval.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::TimedOut => true,
            TransportError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that stop the relay loop.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Receiving or sending failed.
    #[error("transport error: {0}")]
    Transport(#[from] framerelay_transport::TransportError),

    /// A normalized frame could not be re-encoded.
    #[error("envelope error: {0}")]
    Envelope(#[from] framerelay_envelope::EnvelopeError),
}

pub type Result<T> = std::result::Result<T, RelayError>;

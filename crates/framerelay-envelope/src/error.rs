use crate::envelope::Field;

/// Errors that can occur during envelope encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// A value is missing, has the wrong type, or has the wrong arity.
    #[error("malformed envelope: {field}: {reason}")]
    Malformed { field: Field, reason: String },

    /// A length prefix points past the end of the buffer.
    #[error("truncated envelope: {field} needs {needed} bytes, {available} available")]
    Truncated {
        field: Field,
        needed: usize,
        available: usize,
    },

    /// The declared payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The envelope could not be serialized.
    #[error("envelope encoding failed: {0}")]
    Encode(String),
}

impl EnvelopeError {
    pub(crate) fn malformed(field: Field, reason: impl std::fmt::Display) -> Self {
        EnvelopeError::Malformed {
            field,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;

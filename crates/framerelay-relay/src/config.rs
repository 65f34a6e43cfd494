use framerelay_envelope::{EnvelopeConfig, DEFAULT_MAX_PAYLOAD};

/// `source` tag on every forwarded envelope.
pub const DEFAULT_OUTPUT_SOURCE: &str = "image0";

/// Placeholder annotation attached to every forwarded envelope.
pub const DEFAULT_META: &str = "{detections: 3}";

/// Controls how the relay tags forwarded frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub output_source: String,
    pub output_kind: String,
    pub output_format: String,
    pub meta: String,
    /// Largest inbound payload accepted by the decoder.
    pub max_payload_size: usize,
}

impl RelayConfig {
    pub fn envelope_config(&self) -> EnvelopeConfig {
        EnvelopeConfig {
            max_payload_size: self.max_payload_size,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            output_source: DEFAULT_OUTPUT_SOURCE.to_string(),
            output_kind: "image".to_string(),
            output_format: "RGBA".to_string(),
            meta: DEFAULT_META.to_string(),
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

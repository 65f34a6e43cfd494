use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use framerelay_envelope::{decode_envelope, Envelope};
use framerelay_pixel::{normalize, LayoutRegistry, NormalizeError};
use framerelay_transport::{Pusher, Subscriber};
use serde::Serialize;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};

/// Why a received message produced no output.
#[derive(Debug)]
pub enum SkipReason {
    /// The message or envelope could not be decoded.
    Malformed(String),
    /// The `(kind, format)` pair names no known pixel layout.
    Unrecognized { kind: String, format: String },
    /// The layout is known but the frame failed normalization.
    Rejected(NormalizeError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Malformed(reason) => write!(f, "malformed: {reason}"),
            SkipReason::Unrecognized { kind, format } => {
                write!(f, "unrecognized layout: kind={kind} format={format}")
            }
            SkipReason::Rejected(err) => write!(f, "rejected: {err}"),
        }
    }
}

/// Result of processing one envelope.
#[derive(Debug)]
pub enum FrameDisposition {
    /// Encoded output envelope, ready to send.
    Forward(Bytes),
    Skip(SkipReason),
}

/// Result of one loop iteration.
#[derive(Debug)]
pub enum StepOutcome {
    /// The receive poll interval elapsed with no message.
    Idle,
    Forwarded { len: usize },
    Skipped(SkipReason),
}

/// Per-frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub received: u64,
    pub forwarded: u64,
    pub malformed: u64,
    pub unrecognized: u64,
    pub rejected: u64,
}

impl RelayStats {
    pub fn skipped(&self) -> u64 {
        self.malformed + self.unrecognized + self.rejected
    }

    fn record_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::Malformed(_) => self.malformed += 1,
            SkipReason::Unrecognized { .. } => self.unrecognized += 1,
            SkipReason::Rejected(_) => self.rejected += 1,
        }
    }
}

/// Decode, normalize and re-encode one inbound envelope.
///
/// Every recoverable problem becomes a [`FrameDisposition::Skip`]. A frame is
/// either fully converted and encoded or not produced at all.
pub fn process_envelope(
    registry: &LayoutRegistry,
    config: &RelayConfig,
    src: &Bytes,
) -> Result<FrameDisposition> {
    let envelope = match decode_envelope(src, &config.envelope_config()) {
        Ok(envelope) => envelope,
        Err(err) => return Ok(FrameDisposition::Skip(SkipReason::Malformed(err.to_string()))),
    };

    tracing::debug!(
        source = %envelope.source,
        timestamp = %envelope.timestamp,
        kind = %envelope.kind,
        format = %envelope.format,
        format_size = %envelope.format_size,
        payload_len = envelope.payload.len(),
        "decoded envelope"
    );

    let Some(descriptor) = registry.lookup(&envelope.kind, &envelope.format) else {
        return Ok(FrameDisposition::Skip(SkipReason::Unrecognized {
            kind: envelope.kind,
            format: envelope.format,
        }));
    };

    let frame = match normalize(descriptor, envelope.format_size, &envelope.payload) {
        Ok(frame) => frame,
        Err(err) => return Ok(FrameDisposition::Skip(SkipReason::Rejected(err))),
    };

    let format_size = frame.format_size();
    let output = Envelope::new(
        config.output_source.as_str(),
        envelope.timestamp,
        config.output_kind.as_str(),
        config.output_format.as_str(),
        format_size,
        frame.into_output(descriptor),
    )
    .with_meta(config.meta.as_str());

    Ok(FrameDisposition::Forward(output.to_bytes()?))
}

/// Owns both ends of the relay and runs the receive/convert/send loop.
///
/// Each [`step`](Relay::step) waits for one message (Idle), then decodes,
/// converts and sends it before returning (Processing). Nothing carries over
/// between iterations except the counters.
pub struct Relay<S, P> {
    subscriber: S,
    pusher: P,
    registry: LayoutRegistry,
    config: RelayConfig,
    stats: RelayStats,
}

impl<S: Subscriber, P: Pusher> Relay<S, P> {
    /// Relay with the built-in layouts and default output tags.
    pub fn new(subscriber: S, pusher: P) -> Self {
        Self {
            subscriber,
            pusher,
            registry: LayoutRegistry::builtin(),
            config: RelayConfig::default(),
            stats: RelayStats::default(),
        }
    }

    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: LayoutRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Receive and handle one message.
    ///
    /// Transport failures are returned as errors; everything else about a
    /// bad frame is reported as [`StepOutcome::Skipped`].
    pub fn step(&mut self) -> Result<StepOutcome> {
        let message = match self.subscriber.recv_multipart() {
            Ok(message) => message,
            Err(err) if err.is_timeout() => return Ok(StepOutcome::Idle),
            Err(err) => return Err(RelayError::Transport(err)),
        };
        self.stats.received += 1;

        tracing::debug!(
            topic = %message.topic_lossy(),
            parts = message.len(),
            "received message"
        );

        let disposition = match message.body() {
            Some(body) => process_envelope(&self.registry, &self.config, body)?,
            None => FrameDisposition::Skip(SkipReason::Malformed(format!(
                "expected [topic, envelope], got {} part(s)",
                message.len()
            ))),
        };

        match disposition {
            FrameDisposition::Forward(out) => {
                self.pusher.send(&out)?;
                self.stats.forwarded += 1;
                tracing::info!(len = out.len(), forwarded = self.stats.forwarded, "forwarded frame");
                Ok(StepOutcome::Forwarded { len: out.len() })
            }
            FrameDisposition::Skip(reason) => {
                self.stats.record_skip(&reason);
                match &reason {
                    SkipReason::Unrecognized { kind, format } => {
                        tracing::debug!(%kind, %format, "skipping frame with unknown layout");
                    }
                    other => tracing::warn!(reason = %other, "dropping frame"),
                }
                Ok(StepOutcome::Skipped(reason))
            }
        }
    }

    /// Step until `running` clears or `max_messages` messages were received.
    pub fn run(&mut self, running: &AtomicBool, max_messages: Option<u64>) -> Result<RelayStats> {
        tracing::info!("relay loop started");
        while running.load(Ordering::SeqCst) {
            if max_messages.is_some_and(|max| self.stats.received >= max) {
                break;
            }
            self.step()?;
        }
        tracing::info!(
            received = self.stats.received,
            forwarded = self.stats.forwarded,
            skipped = self.stats.skipped(),
            "relay loop stopped"
        );
        Ok(self.stats)
    }

    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    /// Release the subscriber and pusher.
    pub fn into_parts(self) -> (S, P) {
        (self.subscriber, self.pusher)
    }
}

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use framerelay_envelope::{Envelope, FormatSize};
use framerelay_pixel::{expected_payload_len, LayoutRegistry};
use framerelay_transport::{Endpoint, Publisher};

use crate::cmd::{install_ctrlc_handler, PublishArgs};
use crate::exit::{
    envelope_error, io_error, normalize_error, transport_error, CliError, CliResult, DATA_INVALID,
    SUCCESS, USAGE,
};
use crate::output::{print_publish, OutputFormat, PublishOutput};

const METADATA_ONLY_KIND: &str = "metadata_only";

pub fn run(args: PublishArgs, format: OutputFormat) -> CliResult<i32> {
    let envelope = build_envelope(&args)?;
    let encoded = envelope
        .to_bytes()
        .map_err(|err| envelope_error("encode failed", err))?;

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| Endpoint::subscribe_channel(&args.host, args.channel));
    let mut publisher = endpoint
        .bind_publisher()
        .map_err(|err| transport_error("bind failed", err))?;
    tracing::info!(endpoint = %endpoint, topic = %args.topic, "publisher bound");

    let running = install_ctrlc_handler()?;
    let interval = Duration::from_secs(1) / args.fps;
    let mut next_send = Instant::now();
    let mut sent = 0u64;

    while sent < args.count && running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now < next_send {
            std::thread::sleep(next_send - now);
        }
        next_send = Instant::now() + interval;

        publisher
            .publish(args.topic.as_bytes(), &encoded)
            .map_err(|err| transport_error("publish failed", err))?;
        sent += 1;
        tracing::debug!(sent, len = encoded.len(), "published envelope");
    }

    print_publish(
        &PublishOutput {
            event: "publish-summary",
            endpoint: endpoint.to_string(),
            topic: &args.topic,
            kind: &envelope.kind,
            sent,
            envelope_len: encoded.len(),
        },
        format,
    );
    Ok(SUCCESS)
}

/// Build the envelope to publish, checking image payloads before any socket
/// is opened.
fn build_envelope(args: &PublishArgs) -> CliResult<Envelope> {
    let timestamp = unix_millis();

    if args.metadata_only {
        return Ok(Envelope::new(
            args.source.as_str(),
            timestamp,
            METADATA_ONLY_KIND,
            args.pixel_format.as_str(),
            FormatSize::default(),
            Bytes::new(),
        ));
    }

    let (Some(path), Some(width), Some(height)) = (&args.file, args.width, args.height) else {
        return Err(CliError::new(
            USAGE,
            "--file, --width and --height are required unless --metadata-only is set",
        ));
    };

    let payload = std::fs::read(path)
        .map_err(|err| io_error(&format!("read {} failed", path.display()), err))?;
    let size = FormatSize::new(width, height, args.bpp);

    if LayoutRegistry::builtin()
        .lookup(&args.kind, &args.pixel_format)
        .is_some()
    {
        let expected =
            expected_payload_len(size).map_err(|err| normalize_error("invalid frame", err))?;
        if payload.len() != expected {
            return Err(CliError::new(
                DATA_INVALID,
                format!(
                    "payload is {} bytes, {size} needs {expected}",
                    payload.len()
                ),
            ));
        }
    }

    Ok(Envelope::new(
        args.source.as_str(),
        timestamp,
        args.kind.as_str(),
        args.pixel_format.as_str(),
        size,
        payload,
    ))
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

use std::sync::atomic::Ordering;

use framerelay_envelope::{decode_annotated, Envelope, EnvelopeConfig};
use framerelay_pixel::expected_payload_len;
use framerelay_transport::{Endpoint, Puller};

use crate::cmd::{install_ctrlc_handler, parse_duration, SinkArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SinkArgs, format: OutputFormat) -> CliResult<i32> {
    let poll = parse_duration(&args.poll)?;
    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| Endpoint::push_channel(&args.host, args.channel));
    let mut puller = endpoint
        .bind_puller(Some(poll))
        .map_err(|err| transport_error("bind failed", err))?;
    tracing::info!(endpoint = %endpoint, target = %args.target, "sink bound");

    let running = install_ctrlc_handler()?;
    let config = EnvelopeConfig::default();
    let mut accepted = 0u64;

    while running.load(Ordering::SeqCst) {
        if args.count.is_some_and(|count| accepted >= count) {
            break;
        }

        let buf = match puller.recv() {
            Ok(buf) => buf,
            Err(err) if err.is_timeout() => continue,
            Err(err) => return Err(transport_error("receive failed", err)),
        };

        let envelope = match decode_annotated(&buf, &config) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %err, "dropping undecodable envelope");
                continue;
            }
        };

        if let Err(reason) = check_frame(&envelope, &args.target) {
            tracing::warn!(source = %envelope.source, %reason, "ignoring frame");
            continue;
        }

        print_frame(&envelope, format);
        accepted += 1;
    }

    Ok(SUCCESS)
}

/// Accept only RGBA image frames from `target` whose payload fits the
/// declared size.
fn check_frame(envelope: &Envelope, target: &str) -> Result<(), String> {
    if envelope.source != target {
        return Err(format!("source {:?} is not {target:?}", envelope.source));
    }
    if envelope.kind != "image" || envelope.format != "RGBA" {
        return Err(format!(
            "expected image/RGBA, got {}/{}",
            envelope.kind, envelope.format
        ));
    }
    let expected = expected_payload_len(envelope.format_size).map_err(|err| err.to_string())?;
    if envelope.payload.len() != expected {
        return Err(format!(
            "payload is {} bytes, {} needs {expected}",
            envelope.payload.len(),
            envelope.format_size
        ));
    }
    Ok(())
}

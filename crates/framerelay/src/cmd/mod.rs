use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use framerelay_transport::Endpoint;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod publish;
pub mod relay;
pub mod sink;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Subscribe to frames, normalize images to RGBA and push them on.
    Relay(RelayArgs),
    /// Publish a raw frame file as envelopes (test producer).
    Publish(PublishArgs),
    /// Receive forwarded RGBA envelopes and print them (test consumer).
    Sink(SinkArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Relay(args) => relay::run(args, format),
        Command::Publish(args) => publish::run(args, format),
        Command::Sink(args) => sink::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RelayArgs {
    /// Bus host used to derive default endpoints.
    ///
    /// Derived endpoints are tcp:// (ZeroMQ) and need a build with the `zmq`
    /// feature; otherwise pass unix: endpoints via --sub-endpoint and
    /// --push-endpoint.
    #[arg(long, env = "FRAMERELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Inbound channel; subscribes on tcp port 5770 + N (needs `zmq`).
    #[arg(long, env = "FRAMERELAY_RECV_CHANNEL", default_value_t = 0)]
    pub recv_channel: u16,
    /// Outbound channel; pushes to tcp port 5870 + N (needs `zmq`).
    #[arg(long, env = "FRAMERELAY_SEND_CHANNEL", default_value_t = 0)]
    pub send_channel: u16,
    /// Subscription topic prefix.
    #[arg(long, env = "FRAMERELAY_TOPIC", default_value = "out")]
    pub topic: String,
    /// Subscribe here instead of the derived endpoint.
    #[arg(long, value_name = "ENDPOINT")]
    pub sub_endpoint: Option<Endpoint>,
    /// Push here instead of the derived endpoint.
    #[arg(long, value_name = "ENDPOINT")]
    pub push_endpoint: Option<Endpoint>,
    /// Exit after receiving N messages.
    #[arg(long, value_name = "N")]
    pub max_frames: Option<u64>,
    /// `source` tag on forwarded frames.
    #[arg(long, default_value = "image0")]
    pub output_source: String,
    /// How often a blocked receive wakes up to check for shutdown (e.g. 200ms, 1s).
    #[arg(long, default_value = "200ms")]
    pub poll: String,
}

impl RelayArgs {
    pub fn subscribe_endpoint(&self) -> Endpoint {
        self.sub_endpoint
            .clone()
            .unwrap_or_else(|| Endpoint::subscribe_channel(&self.host, self.recv_channel))
    }

    pub fn push_endpoint(&self) -> Endpoint {
        self.push_endpoint
            .clone()
            .unwrap_or_else(|| Endpoint::push_channel(&self.host, self.send_channel))
    }
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Raw payload file.
    #[arg(long, value_name = "PATH", required_unless_present = "metadata_only")]
    pub file: Option<PathBuf>,
    /// Frame width in pixels.
    #[arg(long, required_unless_present = "metadata_only")]
    pub width: Option<u32>,
    /// Frame height in pixels.
    #[arg(long, required_unless_present = "metadata_only")]
    pub height: Option<u32>,
    /// Bits per pixel.
    #[arg(long, default_value_t = 32)]
    pub bpp: u32,
    /// Envelope `kind` tag.
    #[arg(long, default_value = "image")]
    pub kind: String,
    /// Envelope `format` tag (pixel layout name).
    #[arg(long, default_value = "RGBA")]
    pub pixel_format: String,
    /// Envelope `source` tag.
    #[arg(long, default_value = "cam0")]
    pub source: String,
    /// Send a header-only `metadata_only` envelope with an empty payload.
    #[arg(long, conflicts_with_all = ["file", "width", "height"])]
    pub metadata_only: bool,
    /// Number of envelopes to publish.
    #[arg(long, default_value_t = 1)]
    pub count: u64,
    /// Maximum envelopes per second.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,
    /// Topic to publish on.
    #[arg(long, env = "FRAMERELAY_TOPIC", default_value = "out")]
    pub topic: String,
    /// Bus host used to derive the default endpoint.
    #[arg(long, env = "FRAMERELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Channel; binds tcp port 5770 + N (needs `zmq`, or pass --endpoint).
    #[arg(long, env = "FRAMERELAY_RECV_CHANNEL", default_value_t = 0)]
    pub channel: u16,
    /// Bind here instead of the derived endpoint.
    #[arg(long, value_name = "ENDPOINT")]
    pub endpoint: Option<Endpoint>,
}

#[derive(Args, Debug)]
pub struct SinkArgs {
    /// Accept only frames with this `source` tag.
    #[arg(long, default_value = "image0")]
    pub target: String,
    /// Exit after N accepted frames.
    #[arg(long, value_name = "N")]
    pub count: Option<u64>,
    /// Bus host used to derive the default endpoint.
    #[arg(long, env = "FRAMERELAY_HOST", default_value = "127.0.0.1")]
    pub host: String,
    /// Channel; binds tcp port 5870 + N (needs `zmq`, or pass --endpoint).
    #[arg(long, env = "FRAMERELAY_SEND_CHANNEL", default_value_t = 0)]
    pub channel: u16,
    /// Bind here instead of the derived endpoint.
    #[arg(long, value_name = "ENDPOINT")]
    pub endpoint: Option<Endpoint>,
    /// How often a blocked receive wakes up to check for shutdown.
    #[arg(long, default_value = "200ms")]
    pub poll: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

pub(crate) fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(running)
}

use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use framerelay_envelope::{Envelope, Timestamp};
use framerelay_relay::RelayStats;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Frame payload bytes only (sink); key=value lines elsewhere.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    event: &'static str,
    #[serde(flatten)]
    stats: &'a RelayStats,
    skipped: u64,
}

pub fn print_stats(stats: &RelayStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatsOutput {
            event: "relay-stats",
            stats,
            skipped: stats.skipped(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec![
                "RECEIVED",
                "FORWARDED",
                "MALFORMED",
                "UNRECOGNIZED",
                "REJECTED",
            ]);
            table.add_row(vec![
                stats.received.to_string(),
                stats.forwarded.to_string(),
                stats.malformed.to_string(),
                stats.unrecognized.to_string(),
                stats.rejected.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "received={} forwarded={} malformed={} unrecognized={} rejected={}",
                stats.received, stats.forwarded, stats.malformed, stats.unrecognized, stats.rejected
            );
        }
    }
}

/// Summary of one frame accepted by the sink.
#[derive(Serialize)]
pub struct FrameOutput<'a> {
    event: &'static str,
    source: &'a str,
    timestamp: Value,
    width: u32,
    height: u32,
    bits_per_pixel: u32,
    meta: Option<&'a str>,
    payload_len: usize,
}

impl<'a> FrameOutput<'a> {
    pub fn from_envelope(envelope: &'a Envelope) -> Self {
        Self {
            event: "frame-received",
            source: &envelope.source,
            timestamp: timestamp_value(envelope.timestamp),
            width: envelope.format_size.width,
            height: envelope.format_size.height,
            bits_per_pixel: envelope.format_size.bits_per_pixel,
            meta: envelope.meta.as_deref(),
            payload_len: envelope.payload.len(),
        }
    }
}

pub fn print_frame(envelope: &Envelope, format: OutputFormat) {
    let out = FrameOutput::from_envelope(envelope);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SOURCE", "TIMESTAMP", "SIZE", "META", "PAYLOAD"]);
            table.add_row(vec![
                out.source.to_string(),
                envelope.timestamp.to_string(),
                envelope.format_size.to_string(),
                out.meta.unwrap_or("-").to_string(),
                out.payload_len.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "source={} timestamp={} size={} meta={} payload={} bytes",
                out.source,
                envelope.timestamp,
                envelope.format_size,
                out.meta.unwrap_or("-"),
                out.payload_len
            );
        }
        OutputFormat::Raw => print_raw(&envelope.payload),
    }
}

#[derive(Serialize)]
pub struct PublishOutput<'a> {
    pub event: &'static str,
    pub endpoint: String,
    pub topic: &'a str,
    pub kind: &'a str,
    pub sent: u64,
    pub envelope_len: usize,
}

pub fn print_publish(out: &PublishOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["ENDPOINT", "TOPIC", "KIND", "SENT", "BYTES"]);
            table.add_row(vec![
                out.endpoint.clone(),
                out.topic.to_string(),
                out.kind.to_string(),
                out.sent.to_string(),
                out.envelope_len.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "endpoint={} topic={} kind={} sent={} bytes={}",
                out.endpoint, out.topic, out.kind, out.sent, out.envelope_len
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn timestamp_value(timestamp: Timestamp) -> Value {
    match timestamp {
        Timestamp::Unsigned(v) => Value::from(v),
        Timestamp::Signed(v) => Value::from(v),
        Timestamp::Float(v) => Value::from(v),
    }
}

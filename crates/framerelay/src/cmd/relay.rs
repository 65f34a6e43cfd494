use std::sync::atomic::Ordering;

use framerelay_relay::{Relay, RelayConfig};

use crate::cmd::{install_ctrlc_handler, parse_duration, RelayArgs};
use crate::exit::{relay_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: RelayArgs, format: OutputFormat) -> CliResult<i32> {
    let poll = parse_duration(&args.poll)?;
    let sub_endpoint = args.subscribe_endpoint();
    let push_endpoint = args.push_endpoint();

    let subscriber = sub_endpoint
        .connect_subscriber(args.topic.as_bytes(), Some(poll))
        .map_err(|err| transport_error("subscribe failed", err))?;
    let pusher = push_endpoint
        .connect_pusher()
        .map_err(|err| transport_error("push connect failed", err))?;

    tracing::info!(
        subscribe = %sub_endpoint,
        push = %push_endpoint,
        topic = %args.topic,
        "relay connected"
    );

    let config = RelayConfig {
        output_source: args.output_source,
        ..RelayConfig::default()
    };
    let mut relay = Relay::new(subscriber, pusher).with_config(config);

    let running = install_ctrlc_handler()?;
    let result = relay.run(&running, args.max_frames);
    if !running.load(Ordering::SeqCst) {
        tracing::info!("interrupted");
    }

    let stats = *relay.stats();
    drop(relay.into_parts());
    print_stats(&stats, format);

    result.map_err(|err| relay_error("relay failed", err))?;
    Ok(SUCCESS)
}

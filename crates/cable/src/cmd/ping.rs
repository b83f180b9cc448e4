use cable_peer::{connect_with_config, CableConfig, ConnectionConfig};

use crate::cmd::{parse_duration, PingArgs};
use crate::exit::{cable_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_pings, OutputFormat};

pub fn run(args: PingArgs, format: OutputFormat) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be at least 1"));
    }
    let timeout = parse_duration(&args.timeout)?;
    let connection_config = ConnectionConfig {
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
        ..ConnectionConfig::default()
    };
    // Pings are never decoded, so the encoding is irrelevant here.
    let mut conn = connect_with_config(&args.path, CableConfig::default(), &connection_config)
        .map_err(|err| cable_error("connect failed", err))?;

    let mut latencies = Vec::with_capacity(args.count);
    for seq in 1..=args.count {
        let latency = conn
            .ping_blocking()
            .map_err(|err| cable_error("ping failed", err))?;
        tracing::debug!(seq, ?latency, "pong received");
        latencies.push(latency);
    }
    let _ = conn.close();

    print_pings(&latencies, format);
    Ok(SUCCESS)
}

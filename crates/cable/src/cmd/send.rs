use std::fs;
use std::sync::mpsc;

use bytes::Bytes;
use cable_encoding::{Encoding, Payload};
use cable_peer::{connect_with_config, CableConfig, CableError, ConnectionConfig};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{cable_error, io_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_error, print_payload, OutputFormat, RecordKind};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let connection_config = ConnectionConfig {
        read_timeout: Some(wait_timeout),
        write_timeout: Some(wait_timeout),
        ..ConnectionConfig::default()
    };
    let mut conn = connect_with_config(
        &args.path,
        CableConfig::with_encoding(args.encoding),
        &connection_config,
    )
    .map_err(|err| cable_error("connect failed", err))?;

    if !args.wait {
        conn.send(payload)
            .map_err(|err| cable_error("send failed", err))?;
        conn.close()
            .map_err(|err| cable_error("close failed", err))?;
        return Ok(SUCCESS);
    }

    let (tx, rx) = mpsc::channel();
    let id = conn
        .call(payload, move |result| {
            let _ = tx.send(result);
        })
        .map_err(|err| cable_error("call failed", err))?;
    tracing::debug!(id, "call sent, waiting for response");

    let result = loop {
        if let Ok(result) = rx.try_recv() {
            break result;
        }
        match conn.pump() {
            Ok(events) => {
                for event in events {
                    tracing::debug!(?event, "ignoring event while waiting");
                }
            }
            // End of stream fails the call through its handler first.
            Err(err) => break rx.try_recv().unwrap_or(Err(err)),
        }
    };
    let encoding = conn.cable().encoding();
    let _ = conn.close();

    match result {
        Ok(reply) => {
            print_payload(RecordKind::Response, Some(id), &reply, encoding, format);
            Ok(SUCCESS)
        }
        Err(CableError::Remote(message)) => {
            print_error(id, &message, format);
            Ok(FAILURE)
        }
        Err(err) => Err(cable_error("call failed", err)),
    }
}

fn resolve_payload(args: &SendArgs) -> CliResult<Payload> {
    if let Some(json) = &args.json {
        let value = serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json_payload(value, json, args.encoding));
    }
    if let Some(data) = &args.data {
        return Ok(Payload::Text(data.clone()));
    }
    if let Some(path) = &args.file {
        let bytes = fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
        return Ok(Payload::Bytes(Bytes::from(bytes)));
    }
    Ok(Payload::Empty)
}

/// Structured encodings carry the value; byte encodings carry its text.
fn json_payload(value: serde_json::Value, text: &str, encoding: Encoding) -> Payload {
    match encoding {
        Encoding::Json | Encoding::Mixed => Payload::Json(value),
        Encoding::Raw | Encoding::Utf8 => Payload::Text(text.to_string()),
    }
}

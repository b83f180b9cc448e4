use std::io::{IsTerminal, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use cable_encoding::{Encoding, Payload};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

/// What kind of traffic a printed record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Message,
    Request,
    Response,
    Error,
    Ping,
}

impl RecordKind {
    fn as_str(self) -> &'static str {
        match self {
            RecordKind::Message => "MESSAGE",
            RecordKind::Request => "REQUEST",
            RecordKind::Response => "RESPONSE",
            RecordKind::Error => "ERROR",
            RecordKind::Ping => "PING",
        }
    }
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    kind: RecordKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u16>,
    encoding: &'a str,
    payload_size: usize,
    payload: Value,
    timestamp: String,
}

/// Print one message, request or response payload.
pub fn print_payload(
    kind: RecordKind,
    id: Option<u16>,
    payload: &Payload,
    encoding: Encoding,
    format: OutputFormat,
) {
    let wire = encoding.encode(payload).unwrap_or_default();
    match format {
        OutputFormat::Json => {
            let out = RecordOutput {
                kind,
                id,
                encoding: encoding.as_str(),
                payload_size: wire.len(),
                payload: payload_value(payload),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "ID", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    kind.as_str().to_string(),
                    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
                    wire.len().to_string(),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let id = id.map(|id| format!(" id={id}")).unwrap_or_default();
            println!(
                "{}{} size={} payload={}",
                kind.as_str().to_ascii_lowercase(),
                id,
                wire.len(),
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => print_raw(&wire),
    }
}

/// Print a remote failure message.
pub fn print_error(id: u16, message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Raw => print_raw(message.as_bytes()),
        _ => print_payload(
            RecordKind::Error,
            Some(id),
            &Payload::Text(message.to_string()),
            Encoding::Utf8,
            format,
        ),
    }
}

/// Print ping round-trip times.
pub fn print_pings(latencies: &[Duration], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for (seq, latency) in latencies.iter().enumerate() {
                let out = json!({
                    "kind": RecordKind::Ping,
                    "seq": seq + 1,
                    "latency_us": latency.as_micros() as u64,
                    "timestamp": now_unix_seconds(),
                });
                println!("{out}");
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "LATENCY"]);
            for (seq, latency) in latencies.iter().enumerate() {
                table.add_row(vec![(seq + 1).to_string(), format!("{latency:?}")]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for (seq, latency) in latencies.iter().enumerate() {
                println!("pong seq={} time={latency:?}", seq + 1);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_value(payload: &Payload) -> Value {
    match payload {
        Payload::Empty => Value::Null,
        Payload::Bytes(bytes) => Value::String(bytes_preview(bytes)),
        Payload::Text(text) => Value::String(text.clone()),
        Payload::Json(value) => value.clone(),
        Payload::Mixed(mixed) => json!({
            "header": mixed.header,
            "body": bytes_preview(&mixed.body),
        }),
    }
}

fn payload_preview(payload: &Payload) -> String {
    match payload {
        Payload::Empty => String::new(),
        Payload::Bytes(bytes) => bytes_preview(bytes),
        Payload::Text(text) => text.clone(),
        Payload::Json(value) => value.to_string(),
        Payload::Mixed(mixed) => format!("{} + {}", mixed.header, bytes_preview(&mixed.body)),
    }
}

fn bytes_preview(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", bytes.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

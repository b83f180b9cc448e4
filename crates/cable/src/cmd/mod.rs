use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cable_encoding::Encoding;
use cable_peer::{CableConfig, CableError, CableListener, ConnectionConfig};

use crate::exit::{cable_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod echo;
pub mod listen;
pub mod ping;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an echo server.
    Echo(EchoArgs),
    /// Send a message, or a call with --wait.
    Send(SendArgs),
    /// Listen and print received messages and requests.
    Listen(ListenArgs),
    /// Measure round trips to a listening peer.
    Ping(PingArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Ping(args) => ping::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Payload encoding (raw, utf8, json, mixed).
    #[arg(long, short = 'e', env = "CABLE_ENCODING", default_value = "raw")]
    pub encoding: Encoding,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Payload encoding (raw, utf8, json, mixed).
    #[arg(long, short = 'e', env = "CABLE_ENCODING", default_value = "raw")]
    pub encoding: Encoding,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// String payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Send as a call and print the response.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Payload encoding (raw, utf8, json, mixed).
    #[arg(long, short = 'e', env = "CABLE_ENCODING", default_value = "raw")]
    pub encoding: Encoding,
    /// Exit after printing N messages or requests.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PingArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Number of pings to send.
    #[arg(long, short = 'n', default_value = "1")]
    pub count: usize,
    /// Maximum time to wait for each pong (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// How often blocked server reads wake up to check for Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Bind a listener whose connections time out reads every [`POLL_INTERVAL`].
fn bind_listener(path: &std::path::Path, encoding: Encoding) -> CliResult<CableListener> {
    let listener = CableListener::bind(path)
        .map_err(|err| cable_error("bind failed", err))?
        .with_cable_config(CableConfig::with_encoding(encoding))
        .with_connection_config(ConnectionConfig {
            read_timeout: Some(POLL_INTERVAL),
            ..ConnectionConfig::default()
        });
    tracing::info!(path = %path.display(), %encoding, "listening");
    Ok(listener)
}

/// What a server loop should do after a failed pump.
enum PumpOutcome {
    Idle,
    Disconnected,
    Fatal(CliError),
}

fn classify_pump_error(err: CableError) -> PumpOutcome {
    match err {
        CableError::ConnectionClosed => PumpOutcome::Disconnected,
        CableError::Io(ref io) if io.kind() == std::io::ErrorKind::ConnectionReset => {
            PumpOutcome::Disconnected
        }
        err if err.is_timeout() => PumpOutcome::Idle,
        err => PumpOutcome::Fatal(cable_error("receive failed", err)),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
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
        std::time::Duration::from_millis(value)
    } else {
        std::time::Duration::from_secs(value)
    })
}

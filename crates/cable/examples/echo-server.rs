//! Echo server: answers every request with its own payload.
//!
//! Run with:
//!   cargo run -p cable --example echo-server
//!
//! In another terminal:
//!   cargo run -p cable --features cli -- send /tmp/cable-echo-<pid>/echo.sock \
//!     --encoding json --json '{"hello":"world"}' --wait

use std::fs;

use cable::peer::{CableConfig, CableListener, Event};
use cable::Encoding;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("cable-echo-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("echo.sock");

    let listener = CableListener::bind(&sock_path)?
        .with_cable_config(CableConfig::with_encoding(Encoding::Json));
    eprintln!("Listening on {}", sock_path.display());

    let mut conn = listener.accept()?;
    eprintln!("Peer connected");

    while let Ok(events) = conn.pump() {
        for event in events {
            match event {
                Event::Request(payload, responder) => {
                    eprintln!("Request {}: {payload:?}", responder.id());
                    conn.respond(responder, Ok(payload))?;
                }
                Event::Message(payload) => eprintln!("Message: {payload:?}"),
                Event::Ping => eprintln!("Ping"),
                Event::Close => break,
            }
        }
    }
    eprintln!("Peer disconnected");

    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}

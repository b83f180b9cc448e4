use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cable_peer::{ByteChannel, Connection, Event};

use crate::cmd::{
    bind_listener, classify_pump_error, install_ctrlc_handler, EchoArgs, PumpOutcome,
};
use crate::exit::{cable_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: EchoArgs, _format: OutputFormat) -> CliResult<i32> {
    let listener = bind_listener(&args.path, args.encoding)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        let mut conn = listener
            .accept()
            .map_err(|err| cable_error("accept failed", err))?;
        tracing::info!("peer connected");

        while running.load(Ordering::SeqCst) {
            let events = match conn.pump() {
                Ok(events) => events,
                Err(err) => match classify_pump_error(err) {
                    PumpOutcome::Idle => continue,
                    PumpOutcome::Disconnected => break,
                    PumpOutcome::Fatal(err) => return Err(err),
                },
            };
            for event in events {
                echo_event(&mut conn, event);
            }
        }
        tracing::info!("peer disconnected");
    }

    Ok(SUCCESS)
}

/// Messages come back as messages, requests as successful responses.
fn echo_event<S: ByteChannel>(conn: &mut Connection<S>, event: Event) {
    let outcome = match event {
        Event::Message(payload) => {
            tracing::info!(kind = payload.kind(), "echoing message");
            conn.send(payload)
        }
        Event::Request(payload, responder) => {
            tracing::info!(id = responder.id(), kind = payload.kind(), "echoing request");
            conn.respond(responder, Ok(payload))
        }
        Event::Ping | Event::Close => Ok(()),
    };
    if let Err(err) = outcome {
        tracing::warn!(error = %err, "echo failed");
    }
}

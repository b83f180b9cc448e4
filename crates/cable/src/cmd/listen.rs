use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cable_encoding::Payload;
use cable_peer::Event;

use crate::cmd::{
    bind_listener, classify_pump_error, install_ctrlc_handler, ListenArgs, PumpOutcome,
};
use crate::exit::{cable_error, CliResult, SUCCESS};
use crate::output::{print_payload, OutputFormat, RecordKind};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let listener = bind_listener(&args.path, args.encoding)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

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
                match event {
                    Event::Message(payload) => {
                        print_payload(
                            RecordKind::Message,
                            None,
                            &payload,
                            args.encoding,
                            format,
                        );
                    }
                    Event::Request(payload, responder) => {
                        let id = responder.id();
                        print_payload(
                            RecordKind::Request,
                            Some(id),
                            &payload,
                            args.encoding,
                            format,
                        );
                        conn.respond(responder, Ok(Payload::Empty))
                            .map_err(|err| cable_error("response failed", err))?;
                    }
                    Event::Ping => {
                        tracing::debug!("answered ping");
                        continue;
                    }
                    Event::Close => continue,
                }

                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    let _ = conn.close();
                    return Ok(SUCCESS);
                }
            }
        }
        tracing::info!("peer disconnected");
    }

    Ok(SUCCESS)
}

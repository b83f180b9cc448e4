//! Two async connections over an in-memory pipe, pinging each other.
//!
//! Run with:
//!   cargo run -p cable --example async-ping --features async

use cable::peer::{AsyncConnection, CableConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (left, right) = tokio::io::duplex(4096);
    let mut pinger = AsyncConnection::new(left, CableConfig::default());
    let mut ponger = AsyncConnection::new(right, CableConfig::default());

    let responder = tokio::spawn(async move {
        let mut pings = 0usize;
        while let Ok(events) = ponger.pump().await {
            pings += events.len();
        }
        pings
    });

    for round in 1..=5 {
        let latency = pinger.ping_wait().await?;
        println!("ping {round}: {latency:?}");
    }
    pinger.close().await?;

    println!("peer saw {} pings", responder.await?);
    Ok(())
}

//! Listens on a CAN interface for ten seconds, printing temperature and
//! counter readings, and sends one status request at startup.
//!
//! Run with (needs a SocketCAN interface, e.g. `vcan0`):
//!   cargo run --example telemetry-listener -- vcan0
//!
//! In another terminal:
//!   cargo run --features cli -- send vcan0 --id 42 --float 21.5

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use canprims::frame::pack_id;
use canprims::handler::{BusHandler, HandlerConfig};

const TEMPERATURE: u8 = 42;
const COUNTER: u8 = 7;
const STATUS_REQUEST: u8 = 1;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let interface = std::env::args().nth(1).unwrap_or_else(|| "vcan0".into());

    let mut handler = BusHandler::open_with_config(&interface, HandlerConfig::default())?;
    handler.register_parser(|id, frame| {
        eprintln!("id={id} can_id={:#x} len={}", frame.id(), frame.len());
    });
    handler.register_filter(TEMPERATURE, |frame| {
        eprintln!("temperature: {:.2}", frame.to_message().float());
    });
    handler.register_filter(COUNTER, |frame| {
        eprintln!("counter: {}", frame.to_message().long());
    });
    let handler = Arc::new(handler);

    let reader = {
        let handler = Arc::clone(&handler);
        thread::spawn(move || handler.run_read_loop())
    };
    let writer = {
        let handler = Arc::clone(&handler);
        thread::spawn(move || handler.run_write_loop())
    };

    handler.write(pack_id(STATUS_REQUEST)).wait()?;
    eprintln!("Listening on {interface}");

    thread::sleep(Duration::from_secs(10));
    handler.shutdown();

    reader.join().map_err(|_| "read loop panicked")??;
    writer.join().map_err(|_| "write loop panicked")??;
    Ok(())
}

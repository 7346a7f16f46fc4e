use std::sync::Arc;
use std::thread;

use canprims_frame::{pack_float, pack_id, pack_long, pack_short, Message};
use canprims_handler::{BusHandler, HandlerConfig};
use serde::Serialize;
use tracing::debug;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{handler_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct SendOutput<'a> {
    interface: &'a str,
    id: u8,
    can_id: String,
    len: usize,
    sent: u32,
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let message = build_message(&args);

    let handler = BusHandler::open_with_config(&args.interface, HandlerConfig::default())
        .map_err(|err| handler_error("open failed", err))?;
    let handler = Arc::new(handler);

    let writer = {
        let handler = Arc::clone(&handler);
        thread::Builder::new()
            .name("can-writer".into())
            .spawn(move || handler.run_write_loop())
            .map_err(|err| io_error("failed to start write loop", err))?
    };

    let mut sent = 0u32;
    let mut outcome = Ok(());
    for n in 0..args.repeat {
        if n > 0 && !interval.is_zero() {
            thread::sleep(interval);
        }
        if let Err(err) = handler.write(message).wait() {
            outcome = Err(handler_error("send failed", err));
            break;
        }
        sent += 1;
        debug!(sent, "message delivered");
    }

    handler.shutdown();
    match writer.join() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return Err(handler_error("write loop failed", err)),
        Err(_) => return Err(CliError::new(INTERNAL, "write loop panicked")),
    }
    outcome?;

    print_summary(&args.interface, &message, sent, format);
    Ok(SUCCESS)
}

fn build_message(args: &SendArgs) -> Message {
    let message = if let Some(value) = args.short {
        pack_short(args.id, value)
    } else if let Some(value) = args.long {
        pack_long(args.id, value)
    } else if let Some(value) = args.float {
        pack_float(args.id, value)
    } else {
        pack_id(args.id)
    };

    match args.arbitration_id {
        Some(arbitration_id) => message.with_arbitration_id(arbitration_id),
        None => message,
    }
}

fn print_summary(interface: &str, message: &Message, sent: u32, format: OutputFormat) {
    let out = SendOutput {
        interface,
        id: message.id(),
        can_id: format!("{:#x}", message.arbitration_id()),
        len: message.len(),
        sent,
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Raw => {}
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "sent {} x id={} can_id={} len={} on {}",
            out.sent, out.id, out.can_id, out.len, out.interface
        ),
    }
}

#[cfg(test)]
mod tests {
    use canprims_frame::DEFAULT_ARBITRATION_ID;

    use super::*;

    fn args(id: u8) -> SendArgs {
        SendArgs {
            interface: "vcan0".into(),
            id,
            short: None,
            long: None,
            float: None,
            arbitration_id: None,
            repeat: 1,
            interval: "100ms".into(),
        }
    }

    #[test]
    fn id_only_message() {
        let message = build_message(&args(9));
        assert_eq!(message.payload(), &[9]);
        assert_eq!(message.arbitration_id(), DEFAULT_ARBITRATION_ID);
    }

    #[test]
    fn short_value_message() {
        let message = build_message(&SendArgs {
            short: Some(0xABCD),
            ..args(5)
        });
        assert_eq!(message.payload(), &[5, 0xAB, 0xCD]);
    }

    #[test]
    fn float_value_with_arbitration_id() {
        let message = build_message(&SendArgs {
            float: Some(3.14),
            arbitration_id: Some(0x321),
            ..args(42)
        });
        assert_eq!(message.len(), 5);
        assert_eq!(message.float(), 3.14);
        assert_eq!(message.arbitration_id(), 0x321);
    }
}

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use canprims_frame::CanFrame;
use canprims_handler::{BusHandler, HandlerConfig};
use tracing::info;

use crate::cmd::ListenArgs;
use crate::exit::{handler_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut handler = BusHandler::open_with_config(&args.interface, HandlerConfig::default())
        .map_err(|err| handler_error("open failed", err))?;

    let (tx, rx) = mpsc::channel::<CanFrame>();
    match &args.ids {
        Some(ids) => {
            for id in unique_ids(ids) {
                let tx = tx.clone();
                handler.register_filter(id, move |frame| {
                    let _ = tx.send(*frame);
                });
            }
        }
        None => {
            let tx = tx.clone();
            handler.register_parser(move |_, frame| {
                let _ = tx.send(*frame);
            });
        }
    }
    drop(tx);

    let handler = Arc::new(handler);
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let reader = {
        let handler = Arc::clone(&handler);
        thread::Builder::new()
            .name("can-reader".into())
            .spawn(move || handler.run_read_loop())
            .map_err(|err| io_error("failed to start read loop", err))?
    };
    info!(interface = %args.interface, "listening");

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let frame = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(frame) => frame,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if reader.is_finished() {
                    break;
                }
                continue;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };

        print_frame(&frame, format);
        printed = printed.saturating_add(1);

        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    handler.shutdown();
    match reader.join() {
        Ok(Ok(())) => Ok(SUCCESS),
        Ok(Err(err)) => Err(handler_error("read loop failed", err)),
        Err(_) => Err(CliError::new(INTERNAL, "read loop panicked")),
    }
}

/// Filter ids with duplicates removed, so each frame is printed once.
fn unique_ids(ids: &[u8]) -> BTreeSet<u8> {
    ids.iter().copied().collect()
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_filter_ids_register_once() {
        let ids = unique_ids(&[7, 7, 1]);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 7]);
    }
}

use std::io::ErrorKind;
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use canprims_frame::{read_frame, write_frame, CanFrame, Message};
use canprims_transport::{CanBus, CanSocket, Events, Poller, Waker};
use tracing::{debug, info, trace, warn};

use crate::config::HandlerConfig;
use crate::error::{HandlerError, Result};
use crate::queue::{Pending, TransmitQueue, WriteTicket};
use crate::registry::ParserRegistry;

const BUS_TOKEN: u64 = 0;
const WAKER_TOKEN: u64 = u64::MAX;

/// Lifecycle of a [`BusHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Bus handle and multiplexer registration are held.
    Open,
    /// Resources have been released.
    Closed,
}

struct Resources<B> {
    bus: B,
    poller: Poller,
    waker: Waker,
}

/// Owns one CAN bus handle and drives its receive and transmit paths.
///
/// The handler is meant to be shared behind an `Arc`:
/// - one thread calls [`BusHandler::update_read`] (or
///   [`BusHandler::run_read_loop`]); the step is not re-entrant
/// - one thread calls [`BusHandler::update_write`] (or
///   [`BusHandler::run_write_loop`])
/// - any thread calls [`BusHandler::write`]
///
/// Parsers are registered through `&mut self` before the handler is shared,
/// so dispatch never races registration.
pub struct BusHandler<B: CanBus = CanSocket> {
    resources: Option<Resources<B>>,
    registry: ParserRegistry,
    queue: TransmitQueue,
    config: HandlerConfig,
    events: Mutex<Events>,
    shutdown: AtomicBool,
}

impl BusHandler<CanSocket> {
    /// Open a raw CAN socket on `interface` with default configuration.
    pub fn open(interface: &str) -> Result<Self> {
        Self::open_with_config(interface, HandlerConfig::default())
    }

    /// Open a raw CAN socket on `interface` with explicit configuration.
    pub fn open_with_config(interface: &str, config: HandlerConfig) -> Result<Self> {
        let socket = CanSocket::open(interface)?;
        Self::from_bus(socket, config)
    }
}

impl<B: CanBus> BusHandler<B> {
    /// Wrap an already opened bus handle.
    pub fn from_bus(bus: B, config: HandlerConfig) -> Result<Self> {
        Self::from_bus_with_registry(bus, config, ParserRegistry::new())
    }

    /// Wrap an already opened bus handle with a prepared parser registry.
    ///
    /// On failure every resource acquired so far, including `bus`, is
    /// released before the error is returned.
    pub fn from_bus_with_registry(
        bus: B,
        config: HandlerConfig,
        registry: ParserRegistry,
    ) -> Result<Self> {
        let poller = Poller::new()?;
        let waker = Waker::new()?;
        poller.register(bus.as_raw_fd(), BUS_TOKEN)?;
        poller.register(waker.as_raw_fd(), WAKER_TOKEN)?;

        info!(
            transport = bus.transport_name(),
            max_events = config.max_events,
            "bus handler open"
        );

        Ok(Self {
            resources: Some(Resources { bus, poller, waker }),
            registry,
            queue: TransmitQueue::new(),
            events: Mutex::new(Events::with_capacity(config.max_events)),
            config,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Add a parser that sees every received frame with its identifier byte.
    pub fn register_parser<F>(&mut self, parser: F)
    where
        F: Fn(u8, &CanFrame) + Send + Sync + 'static,
    {
        self.registry.register_parser(parser);
    }

    /// Add a parser that sees only frames whose identifier byte is `id`.
    pub fn register_filter<F>(&mut self, id: u8, parser: F)
    where
        F: Fn(&CanFrame) + Send + Sync + 'static,
    {
        self.registry.register_filter(id, parser);
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// The bus handle, while the handler is open.
    pub fn bus(&self) -> Option<&B> {
        self.resources.as_ref().map(|r| &r.bus)
    }

    pub fn state(&self) -> HandlerState {
        if self.resources.is_some() {
            HandlerState::Open
        } else {
            HandlerState::Closed
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Messages queued but not yet taken by the drain loop.
    pub fn pending_writes(&self) -> usize {
        self.queue.len()
    }

    /// Queue `message` for transmission.
    ///
    /// Never blocks beyond acquiring the queue lock. The returned ticket
    /// reports whether the frame reached the bus.
    pub fn write(&self, message: Message) -> WriteTicket {
        self.queue.push(message)
    }

    /// Wait for readiness, then read and dispatch one frame per ready handle.
    ///
    /// Returns the number of frames dispatched. A failed wait is returned as
    /// [`HandlerError::Wait`] and leaves the handler usable; a failed frame
    /// read is logged and skipped.
    pub fn update_read(&self) -> Result<usize> {
        let resources = self.resources.as_ref().ok_or(HandlerError::Closed)?;
        if self.is_shutdown() {
            return Err(HandlerError::Shutdown);
        }

        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match resources
                .poller
                .wait(&mut events, self.config.read_timeout)
            {
                Ok(_) => break,
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    if self.is_shutdown() {
                        return Err(HandlerError::Shutdown);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "readiness wait failed");
                    return Err(HandlerError::Wait(err));
                }
            }
        }

        if self.is_shutdown() {
            return Err(HandlerError::Shutdown);
        }

        let mut dispatched = 0usize;
        for event in events.iter() {
            if event.token() != BUS_TOKEN || !event.is_readable() {
                continue;
            }

            let frame = match read_frame(&resources.bus) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "frame read failed; skipping");
                    continue;
                }
            };

            debug!(
                can_id = frame.id(),
                id = frame.identifier(),
                len = frame.len(),
                "frame received"
            );
            self.registry.dispatch(&frame);
            dispatched += 1;
        }

        Ok(dispatched)
    }

    /// Wait for queued messages, then write until the queue is empty.
    ///
    /// Returns the number of frames written in full. Frames that exhaust the
    /// retry budget are reported through their ticket and skipped.
    pub fn update_write(&self) -> Result<usize> {
        let resources = self.resources.as_ref().ok_or(HandlerError::Closed)?;

        let mut next = self.queue.wait_pop();
        if next.is_none() {
            return Err(HandlerError::Shutdown);
        }

        let mut written = 0usize;
        while let Some(pending) = next {
            if self.transmit(&resources.bus, pending)? {
                written += 1;
            }
            next = self.queue.try_pop();
        }

        trace!(written, "transmit queue drained");
        Ok(written)
    }

    fn transmit(&self, bus: &B, pending: Pending) -> Result<bool> {
        let message = pending.message;
        if message.is_empty() {
            trace!("dropping empty message");
            pending.complete(Ok(()));
            return Ok(false);
        }

        let frame = match CanFrame::from_message(&message) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "message cannot be framed");
                pending.complete(Err(err.into()));
                return Ok(false);
            }
        };

        let retry = self.config.retry;
        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            let err = match write_frame(bus, &frame) {
                Ok(()) => {
                    debug!(
                        can_id = frame.id(),
                        id = frame.identifier(),
                        attempts,
                        "frame written"
                    );
                    pending.complete(Ok(()));
                    return Ok(true);
                }
                Err(err) => err,
            };

            if self.is_shutdown() {
                pending.complete(Err(HandlerError::Shutdown));
                return Err(HandlerError::Shutdown);
            }

            if !retry.allows(attempts) {
                warn!(attempts, error = %err, can_id = frame.id(), "giving up on frame");
                pending.complete(Err(HandlerError::WriteStalled {
                    attempts,
                    source: err,
                }));
                return Ok(false);
            }

            warn!(attempt = attempts, error = %err, "retrying CAN write");
            let delay = retry.backoff(attempts);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }

    /// Call [`BusHandler::update_read`] until shutdown.
    ///
    /// Transient errors are logged and the loop continues.
    pub fn run_read_loop(&self) -> Result<()> {
        loop {
            match self.update_read() {
                Ok(_) => {}
                Err(HandlerError::Shutdown) => return Ok(()),
                Err(err) if err.is_transient() => {
                    debug!(error = %err, "read step failed; continuing");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Call [`BusHandler::update_write`] until shutdown.
    pub fn run_write_loop(&self) -> Result<()> {
        loop {
            match self.update_write() {
                Ok(_) => {}
                Err(HandlerError::Shutdown) => return Ok(()),
                Err(err) if err.is_transient() => {
                    debug!(error = %err, "write step failed; continuing");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Stop both loops. Idempotent.
    ///
    /// Wakes a blocked `update_read`, wakes a blocked `update_write`, aborts
    /// any write retry in progress and fails queued messages with
    /// [`HandlerError::Shutdown`]. Resources stay allocated until
    /// [`BusHandler::close`] or drop.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("bus handler shutting down");

        self.queue.close();
        if let Some(resources) = &self.resources {
            if let Err(err) = resources.waker.wake() {
                warn!(error = %err, "failed to wake read loop");
            }
        }
    }

    /// Shut down and release the bus handle and multiplexer. Idempotent.
    pub fn close(&mut self) {
        self.shutdown();
        if let Some(resources) = self.resources.take() {
            let transport = resources.bus.transport_name();
            drop(resources);
            info!(transport, "bus handler closed");
        }
    }
}

impl<B: CanBus> Drop for BusHandler<B> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<B: CanBus> std::fmt::Debug for BusHandler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusHandler")
            .field("state", &self.state())
            .field("shutdown", &self.is_shutdown())
            .field("registry", &self.registry)
            .field("queue", &self.queue)
            .field("config", &self.config)
            .finish()
    }
}

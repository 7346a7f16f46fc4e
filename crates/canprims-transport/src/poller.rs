use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixDatagram;
use std::time::Duration;

use epoll::{ControlOptions, Event as EpollEvent, Events as Interest};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};

/// Readiness multiplexer backed by `epoll`.
///
/// Handles are registered for read interest under a caller-chosen token;
/// [`Poller::wait`] reports which tokens became ready.
#[derive(Debug)]
pub struct Poller {
    epfd: RawFd,
}

impl Poller {
    /// Create a new epoll instance.
    pub fn new() -> Result<Self> {
        let epfd = epoll::create(true).map_err(TransportError::Poll)?;
        debug!(epfd, "created epoll instance");
        Ok(Self { epfd })
    }

    /// Register `fd` for read readiness under `token`.
    pub fn register(&self, fd: RawFd, token: u64) -> Result<()> {
        epoll::ctl(
            self.epfd,
            ControlOptions::EPOLL_CTL_ADD,
            fd,
            EpollEvent::new(Interest::EPOLLIN, token),
        )
        .map_err(TransportError::Poll)?;
        trace!(fd, token, "registered fd for read readiness");
        Ok(())
    }

    /// Remove `fd` from the interest list.
    pub fn deregister(&self, fd: RawFd) -> Result<()> {
        epoll::ctl(
            self.epfd,
            ControlOptions::EPOLL_CTL_DEL,
            fd,
            EpollEvent::new(Interest::empty(), 0),
        )
        .map_err(TransportError::Poll)
    }

    /// Block until at least one registered handle is ready.
    ///
    /// `None` waits indefinitely. Returns the number of events written into
    /// `events`; zero means the timeout elapsed. `EINTR` surfaces as an
    /// `Interrupted` error so callers can decide whether to retry.
    pub fn wait(&self, events: &mut Events, timeout: Option<Duration>) -> io::Result<usize> {
        events.len = 0;
        let n = epoll::wait(self.epfd, timeout_millis(timeout), &mut events.buf)?;
        events.len = n;
        Ok(n)
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        let _ = epoll::close(self.epfd);
    }
}

impl AsRawFd for Poller {
    fn as_raw_fd(&self) -> RawFd {
        self.epfd
    }
}

/// Convert a wait timeout to epoll milliseconds.
///
/// Rounds up, so only a zero duration polls without blocking.
fn timeout_millis(timeout: Option<Duration>) -> i32 {
    match timeout {
        None => -1,
        Some(d) => i32::try_from(d.as_nanos().div_ceil(1_000_000)).unwrap_or(i32::MAX),
    }
}

/// Reusable buffer of readiness events.
pub struct Events {
    buf: Vec<EpollEvent>,
    len: usize,
}

impl Events {
    /// Allocate room for up to `capacity` events per wait.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: (0..capacity.max(1))
                .map(|_| EpollEvent::new(Interest::empty(), 0))
                .collect(),
            len: 0,
        }
    }

    /// Events reported by the most recent wait.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.buf[..self.len].iter().map(|ev| Event {
            token: ev.data,
            flags: ev.events,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// A single readiness notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    token: u64,
    flags: u32,
}

impl Event {
    /// Token the handle was registered with.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Data is available to read.
    pub fn is_readable(&self) -> bool {
        Interest::from_bits_truncate(self.flags).contains(Interest::EPOLLIN)
    }

    /// The handle reported an error or hang-up.
    pub fn is_error(&self) -> bool {
        Interest::from_bits_truncate(self.flags)
            .intersects(Interest::EPOLLERR | Interest::EPOLLHUP)
    }
}

/// Cross-thread wake-up source for a [`Poller`].
///
/// Register its fd with the poller; [`Waker::wake`] then makes a blocked
/// [`Poller::wait`] return with the waker's token. Backed by a non-blocking
/// datagram pair: a queued byte keeps the fd readable until
/// [`Waker::reset`] drains it.
#[derive(Debug)]
pub struct Waker {
    signal: UnixDatagram,
    readable: UnixDatagram,
}

impl Waker {
    pub fn new() -> Result<Self> {
        let (signal, readable) = UnixDatagram::pair().map_err(TransportError::Poll)?;
        signal.set_nonblocking(true).map_err(TransportError::Poll)?;
        readable.set_nonblocking(true).map_err(TransportError::Poll)?;
        Ok(Self { signal, readable })
    }

    /// Signal the waker. Idempotent until [`Waker::reset`] is called.
    pub fn wake(&self) -> Result<()> {
        match self.signal.send(&[1]) {
            Ok(_) => Ok(()),
            // Queue full: the waker is already signalled.
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    /// Clear pending wake-ups. Returns whether one was pending.
    pub fn reset(&self) -> Result<bool> {
        let mut buf = [0u8; 8];
        let mut pending = false;
        loop {
            match self.readable.recv(&mut buf) {
                Ok(_) => pending = true,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(pending),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl AsRawFd for Waker {
    fn as_raw_fd(&self) -> RawFd {
        self.readable.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_wait_times_out_without_events() {
        let poller = Poller::new().unwrap();
        let (_left, right) = UnixDatagram::pair().unwrap();
        poller.register(right.as_raw_fd(), 7).unwrap();

        let mut events = Events::with_capacity(4);
        let n = poller
            .wait(&mut events, Some(Duration::from_millis(10)))
            .unwrap();
        assert_eq!(n, 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_wait_reports_readable_token() {
        let poller = Poller::new().unwrap();
        let (left, right) = UnixDatagram::pair().unwrap();
        poller.register(right.as_raw_fd(), 7).unwrap();

        left.send(b"x").unwrap();

        let mut events = Events::with_capacity(4);
        let n = poller.wait(&mut events, None).unwrap();
        assert_eq!(n, 1);
        let event = events.iter().next().unwrap();
        assert_eq!(event.token(), 7);
        assert!(event.is_readable());
        assert!(!event.is_error());
    }

    #[test]
    fn test_deregister_stops_reporting() {
        let poller = Poller::new().unwrap();
        let (left, right) = UnixDatagram::pair().unwrap();
        poller.register(right.as_raw_fd(), 1).unwrap();
        poller.deregister(right.as_raw_fd()).unwrap();

        left.send(b"x").unwrap();

        let mut events = Events::with_capacity(4);
        let n = poller
            .wait(&mut events, Some(Duration::from_millis(10)))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_register_invalid_fd_fails() {
        let poller = Poller::new().unwrap();
        let result = poller.register(-1, 0);
        assert!(matches!(result, Err(TransportError::Poll(_))));
    }

    #[test]
    fn test_waker_interrupts_blocking_wait() {
        let poller = Arc::new(Poller::new().unwrap());
        let waker = Arc::new(Waker::new().unwrap());
        poller.register(waker.as_raw_fd(), u64::MAX).unwrap();

        let waiter = {
            let poller = Arc::clone(&poller);
            thread::spawn(move || {
                let mut events = Events::with_capacity(2);
                poller.wait(&mut events, None).unwrap();
                events.iter().map(|e| e.token()).collect::<Vec<_>>()
            })
        };

        thread::sleep(Duration::from_millis(20));
        waker.wake().unwrap();

        let tokens = waiter.join().unwrap();
        assert_eq!(tokens, vec![u64::MAX]);
    }

    #[test]
    fn test_waker_reset_clears_signal() {
        let waker = Waker::new().unwrap();
        assert!(!waker.reset().unwrap());

        waker.wake().unwrap();
        waker.wake().unwrap();
        assert!(waker.reset().unwrap());
        assert!(!waker.reset().unwrap());
    }

    #[test]
    fn test_timeout_rounds_up_to_whole_millis() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(Duration::ZERO)), 0);
        assert_eq!(timeout_millis(Some(Duration::from_micros(900))), 1);
        assert_eq!(timeout_millis(Some(Duration::from_micros(1_001))), 2);
        assert_eq!(timeout_millis(Some(Duration::from_millis(250))), 250);
        assert_eq!(timeout_millis(Some(Duration::from_secs(u64::MAX))), i32::MAX);
    }

    #[test]
    fn test_sub_millisecond_timeout_still_blocks() {
        let poller = Poller::new().unwrap();
        let (_left, right) = UnixDatagram::pair().unwrap();
        poller.register(right.as_raw_fd(), 1).unwrap();

        let mut events = Events::with_capacity(1);
        let started = std::time::Instant::now();
        let n = poller
            .wait(&mut events, Some(Duration::from_micros(900)))
            .unwrap();
        assert_eq!(n, 0);
        assert!(started.elapsed() >= Duration::from_micros(900));
    }
}

use std::collections::VecDeque;
use std::fmt;
use std::sync::{mpsc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use canprims_frame::Message;
use tracing::trace;

use crate::error::{HandlerError, Result};

/// Completion handle for one queued message.
///
/// Resolves once the drain loop has written the frame, given up on it, or
/// the handler has shut down. Dropping the ticket does not cancel the write.
#[derive(Debug)]
pub struct WriteTicket {
    rx: mpsc::Receiver<Result<()>>,
}

impl WriteTicket {
    fn pending() -> (mpsc::Sender<Result<()>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { rx })
    }

    fn resolved(result: Result<()>) -> Self {
        let (tx, ticket) = Self::pending();
        let _ = tx.send(result);
        ticket
    }

    /// Block until the write completes.
    pub fn wait(self) -> Result<()> {
        self.rx.recv().unwrap_or(Err(HandlerError::Abandoned))
    }

    /// Block for at most `timeout`. `None` means the write is still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<()>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(Err(HandlerError::Abandoned)),
        }
    }

    /// Poll without blocking.
    pub fn try_result(&self) -> Option<Result<()>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(HandlerError::Abandoned)),
        }
    }
}

/// A queued message and the channel its outcome is reported on.
pub(crate) struct Pending {
    pub(crate) message: Message,
    done: mpsc::Sender<Result<()>>,
}

impl Pending {
    pub(crate) fn complete(self, result: Result<()>) {
        // The producer may have dropped its ticket.
        let _ = self.done.send(result);
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Pending>,
    closed: bool,
}

/// FIFO of outbound messages shared between producers and one drainer.
///
/// All access goes through one mutex; the condvar signals "non-empty or
/// closed" to the drainer.
#[derive(Default)]
pub struct TransmitQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl TransmitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // The state is a VecDeque plus a flag; it is never left half-updated, so
    // a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `message` and wake the drainer.
    ///
    /// After [`TransmitQueue::close`] the ticket resolves immediately to
    /// [`HandlerError::Shutdown`].
    pub fn push(&self, message: Message) -> WriteTicket {
        let mut state = self.lock();
        if state.closed {
            return WriteTicket::resolved(Err(HandlerError::Shutdown));
        }

        let (done, ticket) = WriteTicket::pending();
        state.pending.push_back(Pending { message, done });
        trace!(queued = state.pending.len(), "message queued");
        drop(state);

        self.ready.notify_all();
        ticket
    }

    /// Block until a message is available and remove it.
    ///
    /// Returns `None` once the queue is closed.
    pub(crate) fn wait_pop(&self) -> Option<Pending> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(pending) = state.pending.pop_front() {
                return Some(pending);
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Remove the front message without blocking.
    pub(crate) fn try_pop(&self) -> Option<Pending> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        state.pending.pop_front()
    }

    /// Reject further pushes, fail everything still queued with
    /// [`HandlerError::Shutdown`], and wake the drainer. Idempotent.
    pub fn close(&self) {
        let drained: Vec<Pending> = {
            let mut state = self.lock();
            state.closed = true;
            state.pending.drain(..).collect()
        };
        self.ready.notify_all();

        for pending in drained {
            pending.complete(Err(HandlerError::Shutdown));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }
}

impl fmt::Debug for TransmitQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("TransmitQueue")
            .field("pending", &state.pending.len())
            .field("closed", &state.closed)
            .finish()
    }
}

//! CAN bus transport primitives.
//!
//! Provides the two OS collaborators the rest of canprims is built on:
//! - [`CanSocket`]: a raw SocketCAN socket bound to one interface
//! - [`Poller`]: an epoll readiness multiplexer, with a [`Waker`] that lets
//!   another thread interrupt a blocked wait
//!
//! This is the lowest layer of canprims. Everything above it talks to the
//! bus through the [`CanBus`] trait, so tests and bridges can substitute
//! their own handle. SocketCAN and epoll are Linux facilities; the
//! workspace targets Linux only.

pub mod error;
pub mod poller;
pub mod socket;
pub mod traits;

pub use error::{Result, TransportError};
pub use poller::{Event, Events, Poller, Waker};
pub use socket::CanSocket;
pub use traits::CanBus;

//! CAN bus primitives for Linux SocketCAN.
//!
//! # Crate Structure
//!
//! - [`transport`]: raw CAN sockets, the `CanBus` trait and the epoll poller
//! - [`frame`]: typed payload codec and CAN frame conversion
//! - [`handler`]: bus handler with parser dispatch and a queued transmit
//!   path (behind the `handler` feature)

/// Re-export transport types.
pub mod transport {
    pub use canprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use canprims_frame::*;
}

/// Re-export handler types (requires `handler` feature).
#[cfg(feature = "handler")]
pub mod handler {
    pub use canprims_handler::*;
}

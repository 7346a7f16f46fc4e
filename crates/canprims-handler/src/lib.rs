//! Bus handler: one CAN interface, two independently driven loop steps.
//!
//! - [`BusHandler::update_read`] waits for readiness, reads one frame per
//!   ready handle and dispatches it through the [`ParserRegistry`].
//! - [`BusHandler::write`] queues a [`Message`](canprims_frame::Message);
//!   [`BusHandler::update_write`] drains the [`TransmitQueue`] onto the bus.
//!
//! Both steps block; [`BusHandler::shutdown`] wakes them up for good.

pub mod config;
pub mod error;
#[cfg(target_os = "linux")]
pub mod handler;
pub mod queue;
pub mod registry;

pub use config::{HandlerConfig, RetryPolicy};
pub use error::{HandlerError, Result};
#[cfg(target_os = "linux")]
pub use handler::{BusHandler, HandlerState};
pub use queue::{TransmitQueue, WriteTicket};
pub use registry::{FilterParser, GlobalParser, ParserRegistry};

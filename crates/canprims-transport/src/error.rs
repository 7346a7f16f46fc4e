/// Errors that can occur in CAN transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The interface name does not fit in `IFNAMSIZ`.
    #[error("interface name too long ({len} bytes, max {max}): {interface}")]
    InterfaceNameTooLong {
        interface: String,
        len: usize,
        max: usize,
    },

    /// The interface name is empty or contains a NUL byte.
    #[error("invalid interface name {interface:?}")]
    InvalidInterfaceName { interface: String },

    /// The raw CAN socket could not be opened or bound to the interface.
    #[error("failed to open CAN socket on {interface}: {source}")]
    Open {
        interface: String,
        source: std::io::Error,
    },

    /// The readiness multiplexer could not be created or updated.
    #[error("readiness multiplexer error: {0}")]
    Poll(std::io::Error),

    /// An I/O error occurred on the bus handle.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The handle has already been closed.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;

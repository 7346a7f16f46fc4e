use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

use socketcan::{CanFrame, Socket};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::CanBus;

/// `IFNAMSIZ` from `<net/if.h>`, including the trailing NUL.
const IFNAMSIZ: usize = 16;

/// Raw SocketCAN socket bound to a single interface.
///
/// Dropping the socket closes it.
#[derive(Debug)]
pub struct CanSocket {
    inner: socketcan::CanSocket,
    interface: String,
}

impl CanSocket {
    /// Open a raw CAN socket on a named interface such as `can0` or `vcan0`.
    pub fn open(interface: &str) -> Result<Self> {
        validate_interface(interface)?;

        let inner = socketcan::CanSocket::open(interface).map_err(|source| TransportError::Open {
            interface: interface.to_string(),
            source,
        })?;

        info!(interface, "opened CAN socket");
        Ok(Self {
            inner,
            interface: interface.to_string(),
        })
    }

    /// Open a raw CAN socket on a kernel interface index.
    pub fn open_if(if_index: u32) -> Result<Self> {
        let interface = format!("if#{if_index}");
        let inner = socketcan::CanSocket::open_iface(if_index).map_err(|source| {
            TransportError::Open {
                interface: interface.clone(),
                source,
            }
        })?;

        info!(if_index, "opened CAN socket");
        Ok(Self { inner, interface })
    }

    /// Interface name, or `if#N` when opened by index.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Switch the socket between blocking and non-blocking mode.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.inner.set_nonblocking(nonblocking)?;
        Ok(())
    }

    /// Set read timeout on the socket. `None` blocks indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Set write timeout on the socket. `None` blocks indefinitely.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Close the socket.
    pub fn close(self) {
        debug!(interface = %self.interface, "closing CAN socket");
        drop(self.inner);
    }
}

fn validate_interface(interface: &str) -> Result<()> {
    if interface.len() >= IFNAMSIZ {
        return Err(TransportError::InterfaceNameTooLong {
            interface: interface.to_string(),
            len: interface.len(),
            max: IFNAMSIZ - 1,
        });
    }
    if interface.is_empty() || interface.contains('\0') {
        return Err(TransportError::InvalidInterfaceName {
            interface: interface.to_string(),
        });
    }
    Ok(())
}

impl CanBus for CanSocket {
    fn read_frame(&self) -> io::Result<CanFrame> {
        self.inner.read_frame()
    }

    fn write_frame(&self, frame: &CanFrame) -> io::Result<()> {
        self.inner.write_frame(frame)
    }

    fn transport_name(&self) -> &'static str {
        "socketcan-raw"
    }
}

impl AsRawFd for CanSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

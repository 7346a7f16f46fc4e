use std::io::ErrorKind;

use canprims_transport::CanBus;
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::frame::CanFrame;

/// Write one frame to `bus` in a single call.
///
/// Interrupted writes are retried. Any other failure is reported as
/// [`FrameError::Io`] and nothing of the frame reached the bus.
pub fn write_frame<B: CanBus + ?Sized>(bus: &B, frame: &CanFrame) -> Result<()> {
    let kernel = frame.to_socketcan()?;
    loop {
        match bus.write_frame(&kernel) {
            Ok(()) => break,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }

    trace!(
        can_id = frame.id(),
        len = frame.len(),
        transport = bus.transport_name(),
        "wrote frame"
    );
    Ok(())
}

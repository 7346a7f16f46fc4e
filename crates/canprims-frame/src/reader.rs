use std::io::ErrorKind;

use canprims_transport::CanBus;
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::frame::CanFrame;

/// Read exactly one frame from `bus`.
///
/// Interrupted reads are retried; any other failure, including a record the
/// bus could not decode, is reported as [`FrameError::Io`].
pub fn read_frame<B: CanBus + ?Sized>(bus: &B) -> Result<CanFrame> {
    let kernel = loop {
        match bus.read_frame() {
            Ok(frame) => break frame,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    };

    let frame = CanFrame::from(&kernel);
    trace!(
        can_id = frame.id(),
        len = frame.len(),
        transport = bus.transport_name(),
        "read frame"
    );
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::os::fd::{AsRawFd, RawFd};
    use std::os::unix::net::UnixDatagram;
    use std::sync::Mutex;

    use super::*;
    use crate::codec::pack_long;
    use crate::writer::write_frame;

    #[test]
    fn read_single_frame() {
        let (left, right) = UnixDatagram::pair().unwrap();
        let frame = CanFrame::from_message(&pack_long(3, 77)).unwrap();
        write_frame(&left, &frame).unwrap();

        let read = read_frame(&right).unwrap();
        assert_eq!(read, frame);
        assert_eq!(read.identifier(), 3);
    }

    #[test]
    fn read_truncated_datagram() {
        let (left, right) = UnixDatagram::pair().unwrap();
        left.send(&[1, 2, 3]).unwrap();

        let err = read_frame(&right).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::InvalidData));
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let (_left, right) = UnixDatagram::pair().unwrap();
        right.set_nonblocking(true).unwrap();

        let err = read_frame(&right).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let frame = CanFrame::new(0x55, &[8, 1]).unwrap();
        let bus = InterruptedThenFrame {
            interrupted: Mutex::new(false),
            frame: frame.to_socketcan().unwrap(),
        };

        assert_eq!(read_frame(&bus).unwrap(), frame);
    }

    struct InterruptedThenFrame {
        interrupted: Mutex<bool>,
        frame: socketcan::CanFrame,
    }

    impl AsRawFd for InterruptedThenFrame {
        fn as_raw_fd(&self) -> RawFd {
            -1
        }
    }

    impl CanBus for InterruptedThenFrame {
        fn read_frame(&self) -> io::Result<socketcan::CanFrame> {
            let mut interrupted = self.interrupted.lock().unwrap();
            if !*interrupted {
                *interrupted = true;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            Ok(self.frame)
        }

        fn write_frame(&self, _frame: &socketcan::CanFrame) -> io::Result<()> {
            Ok(())
        }

        fn transport_name(&self) -> &'static str {
            "scripted"
        }
    }
}

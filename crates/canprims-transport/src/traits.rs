use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixDatagram;

use bytes::{Buf, BufMut};
use socketcan::{CanFrame, EmbeddedFrame, ExtendedId, Id, StandardId};

/// A pollable handle that moves whole CAN frames.
///
/// Every call transfers exactly one frame. A frame the handle could not
/// take in full is an error; callers decide whether to retry.
///
/// The raw fd is used only for readiness registration.
pub trait CanBus: AsRawFd + Send + Sync {
    /// Read one frame.
    fn read_frame(&self) -> io::Result<CanFrame>;

    /// Write one frame.
    fn write_frame(&self, frame: &CanFrame) -> io::Result<()>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

// Loopback record layout:
//
// ┌───────────┬──────────────────┬─────────┬──────────────┐
// │ flags (1) │ id (4B, BE)      │ dlc (1) │ data (0-8B)  │
// └───────────┴──────────────────┴─────────┴──────────────┘
const RECORD_HEADER: usize = 6;
const RECORD_MAX: usize = RECORD_HEADER + 8;
const FLAG_EXTENDED: u8 = 0x01;
const FLAG_REMOTE: u8 = 0x02;

/// Datagram sockets preserve record boundaries, so one end of a
/// `UnixDatagram::pair()` behaves like a loopback bus.
impl CanBus for UnixDatagram {
    fn read_frame(&self) -> io::Result<CanFrame> {
        let mut record = [0u8; RECORD_MAX];
        let n = self.recv(&mut record)?;
        decode_record(&record[..n])
    }

    fn write_frame(&self, frame: &CanFrame) -> io::Result<()> {
        let record = encode_record(frame);
        let sent = self.send(&record)?;
        if sent != record.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("loopback record cut short ({sent} of {} bytes)", record.len()),
            ));
        }
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "unix-datagram"
    }
}

fn encode_record(frame: &CanFrame) -> Vec<u8> {
    let (mut flags, id) = match EmbeddedFrame::id(frame) {
        Id::Standard(id) => (0, u32::from(id.as_raw())),
        Id::Extended(id) => (FLAG_EXTENDED, id.as_raw()),
    };
    if EmbeddedFrame::is_remote_frame(frame) {
        flags |= FLAG_REMOTE;
    }
    let data = EmbeddedFrame::data(frame);

    let mut record = Vec::with_capacity(RECORD_HEADER + data.len());
    record.put_u8(flags);
    record.put_u32(id);
    record.put_u8(EmbeddedFrame::dlc(frame) as u8);
    record.put_slice(data);
    record
}

fn decode_record(mut src: &[u8]) -> io::Result<CanFrame> {
    if src.len() < RECORD_HEADER {
        return Err(invalid_record(format!(
            "truncated loopback record ({} bytes)",
            src.len()
        )));
    }

    let flags = src.get_u8();
    let raw = src.get_u32();
    let dlc = usize::from(src.get_u8());

    let id = if flags & FLAG_EXTENDED != 0 {
        ExtendedId::new(raw).map(Id::Extended)
    } else {
        u16::try_from(raw)
            .ok()
            .and_then(StandardId::new)
            .map(Id::Standard)
    }
    .ok_or_else(|| invalid_record(format!("id 0x{raw:x} out of range")))?;

    let frame = if flags & FLAG_REMOTE != 0 {
        <CanFrame as EmbeddedFrame>::new_remote(id, dlc)
    } else if src.len() == dlc {
        <CanFrame as EmbeddedFrame>::new(id, src)
    } else {
        None
    };
    frame.ok_or_else(|| invalid_record(format!("bad length (dlc {dlc}, {} data bytes)", src.len())))
}

fn invalid_record(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

use socketcan::{EmbeddedFrame, ExtendedId, Id, StandardId};

use crate::codec::parse_id;
use crate::error::{FrameError, Result};
use crate::message::Message;

/// Maximum payload of a classic CAN frame.
pub const CAN_MAX_DLEN: usize = 8;

/// Marks a 29-bit extended id in the `u32` arbitration id form used by
/// [`Message`] and [`CanFrame::id`].
pub const EFF_FLAG: u32 = 0x8000_0000;

/// A classic CAN frame: arbitration id and up to 8 payload bytes.
///
/// Holds its own copy of the payload so frames can be handed to parsers and
/// across threads freely; [`CanFrame::to_socketcan`] and the `From`
/// conversion bridge to the kernel representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    remote: bool,
    error: bool,
    len: u8,
    data: [u8; CAN_MAX_DLEN],
}

/// Map the `u32` arbitration id form onto a validated CAN id.
fn can_id(id: u32) -> Result<Id> {
    let parsed = if id & EFF_FLAG != 0 {
        ExtendedId::new(id & !EFF_FLAG).map(Id::Extended)
    } else {
        u16::try_from(id)
            .ok()
            .and_then(StandardId::new)
            .map(Id::Standard)
    };
    parsed.ok_or(FrameError::IdTooLarge { id })
}

impl CanFrame {
    /// Build a data frame, validating the id range and payload length.
    ///
    /// Set [`EFF_FLAG`] in `id` for a 29-bit extended id.
    pub fn new(id: u32, payload: &[u8]) -> Result<Self> {
        let id = can_id(id)?;
        if payload.len() > CAN_MAX_DLEN {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: CAN_MAX_DLEN,
            });
        }

        let mut data = [0u8; CAN_MAX_DLEN];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            remote: false,
            error: false,
            len: payload.len() as u8,
            data,
        })
    }

    /// Build the frame that carries `message` under its arbitration id.
    pub fn from_message(message: &Message) -> Result<Self> {
        Self::new(message.arbitration_id(), message.payload())
    }

    /// The validated CAN id.
    pub fn can_id(&self) -> Id {
        self.id
    }

    /// Arbitration id, with [`EFF_FLAG`] set for extended ids.
    pub fn id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => u32::from(id.as_raw()),
            Id::Extended(id) => id.as_raw() | EFF_FLAG,
        }
    }

    /// Arbitration id without the extended flag.
    pub fn raw_id(&self) -> u32 {
        self.id() & !EFF_FLAG
    }

    pub fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Payload length (0-8).
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The meaningful payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// The identifier byte carried in the payload.
    pub fn identifier(&self) -> u8 {
        parse_id(&self.data, self.len())
    }

    /// Copy the payload into a [`Message`] that would be sent back under the
    /// same arbitration id.
    pub fn to_message(&self) -> Message {
        Message::from_raw(self.data, self.len).with_arbitration_id(self.id())
    }

    /// Build the kernel frame for this frame.
    pub fn to_socketcan(&self) -> Result<socketcan::CanFrame> {
        let frame = if self.remote {
            <socketcan::CanFrame as EmbeddedFrame>::new_remote(self.id, self.len())
        } else {
            <socketcan::CanFrame as EmbeddedFrame>::new(self.id, self.data())
        };
        frame.ok_or(FrameError::PayloadTooLarge {
            size: self.len(),
            max: CAN_MAX_DLEN,
        })
    }
}

impl From<&socketcan::CanFrame> for CanFrame {
    fn from(frame: &socketcan::CanFrame) -> Self {
        let remote = EmbeddedFrame::is_remote_frame(frame);
        let payload = EmbeddedFrame::data(frame);
        let len = if remote {
            EmbeddedFrame::dlc(frame)
        } else {
            payload.len()
        }
        .min(CAN_MAX_DLEN);

        let mut data = [0u8; CAN_MAX_DLEN];
        let copied = payload.len().min(len);
        data[..copied].copy_from_slice(&payload[..copied]);

        Self {
            id: EmbeddedFrame::id(frame),
            remote,
            error: matches!(frame, socketcan::CanFrame::Error(_)),
            len: len as u8,
            data,
        }
    }
}

//! Logical messages queued for transmission or decoded from received frames.

use crate::codec::{parse_float, parse_id, parse_long, parse_short};
use crate::error::{FrameError, Result};
use crate::frame::CAN_MAX_DLEN;

/// Arbitration id used when a message does not name one.
pub const DEFAULT_ARBITRATION_ID: u32 = 0x123;

/// A payload of up to 8 bytes plus the arbitration id it is sent under.
///
/// Byte 0 holds the identifier once the message has been packed with one of
/// the `pack_*` functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    len: u8,
    data: [u8; CAN_MAX_DLEN],
    arbitration_id: u32,
}

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message from raw payload bytes.
    pub fn from_bytes(payload: &[u8]) -> Result<Self> {
        if payload.len() > CAN_MAX_DLEN {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: CAN_MAX_DLEN,
            });
        }
        let mut data = [0u8; CAN_MAX_DLEN];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self::from_raw(data, payload.len() as u8))
    }

    pub(crate) fn from_raw(data: [u8; CAN_MAX_DLEN], len: u8) -> Self {
        debug_assert!(len as usize <= CAN_MAX_DLEN);
        Self {
            len,
            data,
            arbitration_id: DEFAULT_ARBITRATION_ID,
        }
    }

    /// Send this message under `arbitration_id`.
    pub fn with_arbitration_id(mut self, arbitration_id: u32) -> Self {
        self.arbitration_id = arbitration_id;
        self
    }

    pub fn arbitration_id(&self) -> u32 {
        self.arbitration_id
    }

    /// Number of meaningful payload bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The meaningful payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// The full 8-byte buffer, including unused trailing bytes.
    pub fn data(&self) -> &[u8; CAN_MAX_DLEN] {
        &self.data
    }

    pub fn id(&self) -> u8 {
        parse_id(&self.data, self.len())
    }

    pub fn short(&self) -> u16 {
        parse_short(&self.data, self.len())
    }

    pub fn long(&self) -> u32 {
        parse_long(&self.data, self.len())
    }

    pub fn float(&self) -> f32 {
        parse_float(&self.data, self.len())
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::from_raw([0u8; CAN_MAX_DLEN], 0)
    }
}

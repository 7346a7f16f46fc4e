//! Typed payload codec and CAN frame encoding.
//!
//! Every message carries a one-byte identifier followed by an optional
//! fixed-width value:
//! - byte 0: identifier (0-255)
//! - bytes 1..3: `u16`, or bytes 1..5: `u32` / `f32` bit pattern
//! - multi-byte values are big-endian
//!
//! Messages travel inside classic CAN frames (at most 8 payload bytes); the
//! [`CanFrame`] type validates ids and converts to and from `socketcan` frames.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;
pub mod reader;
pub mod writer;

pub use codec::{
    encode_long, encode_short, pack_float, pack_id, pack_long, pack_short, parse_float, parse_id,
    parse_long, parse_short, FLOAT_LEN, ID_LEN, INVALID_ID, LONG_LEN, SHORT_LEN,
};
pub use error::{FrameError, Result};
pub use frame::{CanFrame, CAN_MAX_DLEN, EFF_FLAG};
pub use socketcan::{ExtendedId, Id, StandardId};
pub use message::{Message, DEFAULT_ARBITRATION_ID};
pub use reader::read_frame;
pub use writer::write_frame;

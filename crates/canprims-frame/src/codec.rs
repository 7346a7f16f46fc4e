use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};
use crate::frame::CAN_MAX_DLEN;
use crate::message::Message;

/// Identifier returned when a payload carries no identifier byte.
///
/// Zero is also a legal identifier; only the payload length tells the two
/// apart.
pub const INVALID_ID: u8 = 0;

/// Packed length of an identifier-only message.
pub const ID_LEN: usize = 1;
/// Packed length of an identifier plus `u16`.
pub const SHORT_LEN: usize = 3;
/// Packed length of an identifier plus `u32`.
pub const LONG_LEN: usize = 5;
/// Packed length of an identifier plus `f32`.
pub const FLOAT_LEN: usize = LONG_LEN;

/// Payload layout:
/// ```text
/// ┌────────────┬──────────────────────────────┐
/// │ Id (1B)    │ Value (0, 2 or 4 bytes, BE)  │
/// └────────────┴──────────────────────────────┘
/// ```
///
/// Returns byte 0, or [`INVALID_ID`] when `len` is zero or `data` is empty.
pub fn parse_id(data: &[u8], len: usize) -> u8 {
    if len == 0 {
        return INVALID_ID;
    }
    data.first().copied().unwrap_or(INVALID_ID)
}

/// Pack an identifier-only message.
pub fn pack_id(id: u8) -> Message {
    let mut data = [0u8; CAN_MAX_DLEN];
    data[0] = id;
    Message::from_raw(data, ID_LEN as u8)
}

/// Pack an identifier and a `u16`. The message length is 3.
pub fn pack_short(id: u8, value: u16) -> Message {
    let mut data = [0u8; CAN_MAX_DLEN];
    let mut dst = &mut data[..];
    dst.put_u8(id);
    dst.put_u16(value);
    Message::from_raw(data, SHORT_LEN as u8)
}

/// Decode the `u16` following the identifier. Returns 0 if fewer than 3
/// bytes are available.
pub fn parse_short(data: &[u8], len: usize) -> u16 {
    if len < SHORT_LEN || data.len() < SHORT_LEN {
        return 0;
    }
    (&data[ID_LEN..SHORT_LEN]).get_u16()
}

/// Pack an identifier and a `u32`. The message length is 5.
pub fn pack_long(id: u8, value: u32) -> Message {
    let mut data = [0u8; CAN_MAX_DLEN];
    let mut dst = &mut data[..];
    dst.put_u8(id);
    dst.put_u32(value);
    Message::from_raw(data, LONG_LEN as u8)
}

/// Decode the `u32` following the identifier. Returns 0 if fewer than 5
/// bytes are available.
pub fn parse_long(data: &[u8], len: usize) -> u32 {
    if len < LONG_LEN || data.len() < LONG_LEN {
        return 0;
    }
    (&data[ID_LEN..LONG_LEN]).get_u32()
}

/// Pack an identifier and an `f32`.
///
/// The float travels as its exact IEEE-754 bit pattern, so NaN payloads
/// and signed zeros survive unchanged.
pub fn pack_float(id: u8, value: f32) -> Message {
    pack_long(id, value.to_bits())
}

/// Decode the `f32` following the identifier. Returns NaN if fewer than 5
/// bytes are available.
pub fn parse_float(data: &[u8], len: usize) -> f32 {
    if len < FLOAT_LEN || data.len() < FLOAT_LEN {
        return f32::NAN;
    }
    f32::from_bits(parse_long(data, len))
}

/// Encode an identifier and a `u16` into the front of `dst`.
///
/// Returns the number of bytes written.
pub fn encode_short(id: u8, value: u16, dst: &mut [u8]) -> Result<usize> {
    if dst.len() < SHORT_LEN {
        return Err(FrameError::BufferTooSmall {
            needed: SHORT_LEN,
            available: dst.len(),
        });
    }
    let mut buf = &mut dst[..SHORT_LEN];
    buf.put_u8(id);
    buf.put_u16(value);
    Ok(SHORT_LEN)
}

/// Encode an identifier and a `u32` into the front of `dst`.
///
/// Returns the number of bytes written.
pub fn encode_long(id: u8, value: u32, dst: &mut [u8]) -> Result<usize> {
    if dst.len() < LONG_LEN {
        return Err(FrameError::BufferTooSmall {
            needed: LONG_LEN,
            available: dst.len(),
        });
    }
    let mut buf = &mut dst[..LONG_LEN];
    buf.put_u8(id);
    buf.put_u32(value);
    Ok(LONG_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_float_scenario() {
        let msg = pack_float(42, 3.14);

        assert_eq!(msg.len(), FLOAT_LEN);
        assert_eq!(msg.payload(), &[42, 0x40, 0x48, 0xF5, 0xC3]);
        assert_eq!(parse_id(msg.payload(), msg.len()), 42);
        assert_eq!(parse_float(msg.payload(), msg.len()), 3.14);
    }

    #[test]
    fn test_pack_short_scenario() {
        let msg = pack_short(5, 0xABCD);

        assert_eq!(msg.len(), SHORT_LEN);
        assert_eq!(msg.payload(), &[5, 0xAB, 0xCD]);
        assert_eq!(parse_id(msg.payload(), msg.len()), 5);
        assert_eq!(parse_short(msg.payload(), msg.len()), 0xABCD);
    }

    #[test]
    fn test_pack_long_layout() {
        let msg = pack_long(9, 0x0102_0304);
        assert_eq!(msg.payload(), &[9, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(parse_long(msg.payload(), msg.len()), 0x0102_0304);
    }

    #[test]
    fn test_pack_id_only() {
        let msg = pack_id(200);
        assert_eq!(msg.len(), ID_LEN);
        assert_eq!(parse_id(msg.payload(), msg.len()), 200);
        assert_eq!(parse_short(msg.payload(), msg.len()), 0);
    }

    #[test]
    fn test_identifier_survives_every_value_width() {
        for id in 0..=u8::MAX {
            let short = pack_short(id, u16::MAX - u16::from(id));
            let long = pack_long(id, u32::from(id) << 24 | 0x00AB_CDEF);
            let float = pack_float(id, -f32::from(id) / 3.0);

            assert_eq!(parse_id(short.payload(), short.len()), id);
            assert_eq!(parse_id(long.payload(), long.len()), id);
            assert_eq!(parse_id(float.payload(), float.len()), id);

            assert_eq!(
                parse_short(short.payload(), short.len()),
                u16::MAX - u16::from(id)
            );
            assert_eq!(
                parse_long(long.payload(), long.len()),
                u32::from(id) << 24 | 0x00AB_CDEF
            );
            assert_eq!(
                parse_float(float.payload(), float.len()).to_bits(),
                (-f32::from(id) / 3.0).to_bits()
            );
        }
    }

    #[test]
    fn test_float_bit_patterns_preserved() {
        let values = [
            0.0f32,
            -0.0,
            f32::MIN_POSITIVE,
            f32::MAX,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::from_bits(0x7FC0_0001),
            f32::from_bits(0xFF80_0001),
        ];
        for value in values {
            let msg = pack_float(1, value);
            let decoded = parse_float(msg.payload(), msg.len());
            assert_eq!(decoded.to_bits(), value.to_bits());
        }
    }

    #[test]
    fn test_parse_long_one_byte_short() {
        let buf = [1u8, 0xFF, 0xFF, 0xFF, 0xFF];
        assert_eq!(parse_long(&buf, 4), 0);
    }

    #[test]
    fn test_underflow_defaults() {
        let buf = [7u8, 0x12];

        assert_eq!(parse_short(&buf, 2), 0);
        assert_eq!(parse_long(&buf, 2), 0);
        assert!(parse_float(&buf, 2).is_nan());
        assert!(parse_float(&buf, 4).is_nan());
        assert_eq!(parse_id(&buf, 0), INVALID_ID);
        assert_eq!(parse_id(&[], 5), INVALID_ID);
    }

    #[test]
    fn test_len_larger_than_slice_does_not_overread() {
        let buf = [7u8, 0x12, 0x34];

        assert_eq!(parse_short(&buf, 8), 0x1234);
        assert_eq!(parse_long(&buf, 8), 0);
        assert!(parse_float(&buf, 8).is_nan());
    }

    #[test]
    fn test_encode_into_slice() {
        let mut buf = [0u8; 8];
        assert_eq!(encode_short(3, 0x0A0B, &mut buf).unwrap(), SHORT_LEN);
        assert_eq!(&buf[..SHORT_LEN], &[3, 0x0A, 0x0B]);

        assert_eq!(encode_long(4, 0xDEAD_BEEF, &mut buf).unwrap(), LONG_LEN);
        assert_eq!(parse_long(&buf, LONG_LEN), 0xDEAD_BEEF);
    }

    #[test]
    fn test_encode_rejects_small_buffer() {
        let mut buf = [0u8; 4];
        assert!(encode_short(1, 1, &mut buf[..2]).is_err());
        let err = encode_long(1, 1, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::BufferTooSmall {
                needed: LONG_LEN,
                available: 4
            }
        ));
    }
}

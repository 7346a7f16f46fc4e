/// Errors that can occur during message packing and frame conversion.
///
/// Decoding a typed value from a short payload is not an error: the parse
/// functions return sentinel values instead.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the classic CAN limit.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The arbitration id does not fit the standard or extended id range.
    #[error("arbitration id 0x{id:x} out of range")]
    IdTooLarge { id: u32 },

    /// The destination buffer cannot hold the encoded value.
    #[error("buffer too small ({available} bytes, need {needed})")]
    BufferTooSmall { needed: usize, available: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;

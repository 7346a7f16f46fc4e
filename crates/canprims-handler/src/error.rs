/// Errors that can occur in bus handler operations.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] canprims_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] canprims_frame::FrameError),

    /// Waiting on the readiness multiplexer failed.
    #[error("readiness wait failed: {0}")]
    Wait(std::io::Error),

    /// A frame could not be written within the retry budget.
    #[error("write stalled after {attempts} attempts: {source}")]
    WriteStalled {
        attempts: u32,
        source: canprims_frame::FrameError,
    },

    /// The handler was shut down.
    #[error("handler shut down")]
    Shutdown,

    /// The handler's resources have been released.
    #[error("handler closed")]
    Closed,

    /// The transmit queue went away before reporting a result.
    #[error("write abandoned before completion")]
    Abandoned,
}

impl HandlerError {
    /// Whether a loop step may simply be called again after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HandlerError::Wait(_) | HandlerError::Frame(_) | HandlerError::WriteStalled { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HandlerError>;

/// Error kinds shared across the capture pipeline.
///
/// Mirrors the error-kind taxonomy used throughout the rest of the session
/// (`rdp-session`, `rdp-encode`): invalid arguments, unsupported operations, and
/// opaque failures. `Timeout`/`WouldBlock` cover the blocking-call family; "no frame
/// yet" isn't an error here at all — `FrameQueue::wait` signals it with `None`.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("capture failed: {0}")]
    Failed(String),

    #[error("operation timed out")]
    Timeout,

    #[error("operation would block")]
    WouldBlock,
}

pub type Result<T> = core::result::Result<T, CaptureError>;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("encode failed: {0}")]
    Failed(String),

    /// Nothing changed since the last encode and no refresh is due — not a failure,
    /// just nothing to send this cycle.
    #[error("no change to encode")]
    Pending,
}

pub type Result<T> = core::result::Result<T, EncodeError>;

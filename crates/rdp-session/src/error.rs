#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("session failed: {0}")]
    Failed(String),

    #[error("server redirection requested")]
    ServerRedirection,
}

pub type Result<T> = core::result::Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("injection failed: {0}")]
    Failed(String),
}

pub type Result<T> = core::result::Result<T, InputError>;

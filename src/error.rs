//! Single error type for the core. Every fallible operation in this crate
//! returns `Result<T, FsError>`; the CLI binary is the only place that turns
//! these into process exit codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("corrupt image: {0}")]
    CorruptImage(String),

    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("exhausted: {0}")]
    Exhausted(String),

    #[error("I/O failure")]
    IoFailure(#[from] std::io::Error),
}

pub type FsResult<T> = Result<T, FsError>;

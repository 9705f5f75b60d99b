use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Empty input")]
    EmptyInput,

    #[error("External service failed: {0}")]
    ExternalService(String),

    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Unsupported content kind: {0}")]
    UnsupportedContentKind(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn operation<E: std::fmt::Display>(err: E) -> Self {
        Error::Operation(err.to_string())
    }

    pub fn external<E: std::fmt::Display>(err: E) -> Self {
        Error::ExternalService(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

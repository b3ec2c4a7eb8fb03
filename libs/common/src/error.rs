use errors::ConsoleError;
use thiserror::Error;

/// Basic library error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging setup error
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Error result type
pub type Result<T> = std::result::Result<T, Error>;

// Serialization error converting
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<Error> for ConsoleError {
    fn from(err: Error) -> Self {
        match err {
            Error::Config(msg) => ConsoleError::Configuration(msg),
            Error::Logging(msg) => ConsoleError::Logging(msg),
            Error::Io(e) => ConsoleError::Io(e),
            Error::Serialization(msg) => ConsoleError::Serialization(msg),
        }
    }
}

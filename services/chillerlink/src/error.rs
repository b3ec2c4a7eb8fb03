//! Error handling for the chiller link
//!
//! None of these errors terminate the link. Open and read faults degrade the
//! connection to `Disconnected` and self-recover; decode faults are counted and
//! the line is dropped. Only `Config` surfaces at startup.

use errors::{ConsoleError, ConsoleErrorTrait, ErrorCategory};
use thiserror::Error;

/// Link error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    /// The device could not be opened
    #[error("Port {port} unavailable: {reason}")]
    PortUnavailable { port: String, reason: String },

    /// I/O fault while reading from an open device
    #[error("Read fault: {0}")]
    TransientRead(String),

    /// A framed line is not a telemetry object
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Outbound bytes could not be delivered
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// No open handle
    #[error("Link not connected")]
    NotConnected,

    /// Invalid link configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for link operations
pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    pub fn port_unavailable(port: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::PortUnavailable {
            port: port.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        LinkError::MalformedRecord(err.to_string())
    }
}

impl From<LinkError> for ConsoleError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::PortUnavailable { port, reason } => ConsoleError::ConnectionFailed {
                endpoint: port,
                reason,
            },
            LinkError::TransientRead(msg) | LinkError::WriteFailed(msg) => ConsoleError::Link(msg),
            LinkError::MalformedRecord(msg) => ConsoleError::Serialization(msg),
            LinkError::NotConnected => ConsoleError::Link("not connected".to_string()),
            LinkError::Config(msg) => errors::config_error!(msg),
        }
    }
}

impl ConsoleErrorTrait for LinkError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PortUnavailable { .. } => "LINK_PORT_UNAVAILABLE",
            Self::TransientRead(_) => "LINK_READ_FAULT",
            Self::MalformedRecord(_) => "LINK_MALFORMED_RECORD",
            Self::WriteFailed(_) => "LINK_WRITE_FAILED",
            Self::NotConnected => "LINK_NOT_CONNECTED",
            Self::Config(_) => "LINK_CONFIG_ERROR",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::PortUnavailable { .. } | Self::NotConnected => ErrorCategory::Connection,
            Self::TransientRead(_) | Self::WriteFailed(_) => ErrorCategory::Protocol,
            Self::MalformedRecord(_) => ErrorCategory::DataCorruption,
            Self::Config(_) => ErrorCategory::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LinkError::port_unavailable("/dev/ttyACM0", "busy").is_retryable());
        assert!(LinkError::TransientRead("eof".into()).is_retryable());
        assert!(!LinkError::malformed("x").is_retryable());
        assert!(!LinkError::config("x").is_retryable());
    }

    #[test]
    fn test_malformed_logs_quietly() {
        assert_eq!(LinkError::malformed("x").log_level(), tracing::Level::DEBUG);
        assert_eq!(LinkError::NotConnected.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_into_console_error() {
        let err: ConsoleError = LinkError::port_unavailable("/dev/ttyUSB0", "no such file").into();
        assert!(matches!(
            err,
            ConsoleError::ConnectionFailed { ref endpoint, .. } if endpoint == "/dev/ttyUSB0"
        ));

        let err: ConsoleError = LinkError::config("baud_rate must be > 0").into();
        assert!(matches!(err, ConsoleError::Configuration(_)));
    }

    #[test]
    fn test_display() {
        let err = LinkError::port_unavailable("COM3", "access denied");
        assert_eq!(err.to_string(), "Port COM3 unavailable: access denied");
    }
}

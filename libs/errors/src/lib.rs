//! Unified error handling for the chiller console workspace
//!
//! Library crates keep their own domain error enums (e.g. the link's
//! `LinkError`) and gain a common outward interface by implementing
//! [`ConsoleErrorTrait`]. Binaries funnel everything into [`ConsoleError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ErrorInfo - machine-readable error summary
// ============================================================================

/// Serializable error summary for status output (`--json`) and logs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorInfo {
    /// Stable error code
    pub code: String,
    /// Error message
    pub message: String,
    /// Error category name
    pub category: String,
    /// Whether retrying may succeed
    pub retryable: bool,
}

impl ErrorInfo {
    /// Build the summary for any error implementing the workspace trait
    pub fn from_error<E: ConsoleErrorTrait>(err: &E) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
            category: format!("{:?}", err.category()),
            retryable: err.is_retryable(),
        }
    }
}

// ============================================================================
// ConsoleError - Main error type
// ============================================================================

/// Main error type for the console binaries
#[derive(Debug, Error)]
pub enum ConsoleError {
    // ======================================
    // Configuration Errors
    // ======================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ======================================
    // Link & Communication Errors
    // ======================================
    #[error("Link error: {0}")]
    Link(String),

    #[error("Connection failed: {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    // ======================================
    // Validation Errors
    // ======================================
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    // ======================================
    // File & I/O Errors
    // ======================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ======================================
    // Service & Runtime Errors
    // ======================================
    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type alias using ConsoleError
pub type ConsoleResult<T> = Result<T, ConsoleError>;

// Conversion traits for common error types
impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConsoleError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<figment::Error> for ConsoleError {
    fn from(err: figment::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

// Helper macros for creating errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::ConsoleError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::ConsoleError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr) => {
        $crate::ConsoleError::Validation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::ConsoleError::Validation(format!($fmt, $($arg)*))
    };
}

impl ConsoleErrorTrait for ConsoleError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Link(_) => "LINK_ERROR",
            Self::ConnectionFailed { .. } => "CONNECTION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UnknownPreset(_) => "UNKNOWN_PRESET",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Logging(_) => "LOGGING_ERROR",
            Self::Runtime(_) => "RUNTIME_ERROR",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Link(_) => ErrorCategory::Protocol,
            Self::ConnectionFailed { .. } => ErrorCategory::Connection,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::UnknownPreset(_) => ErrorCategory::NotFound,
            Self::Io(_) | Self::Serialization(_) | Self::Logging(_) | Self::Runtime(_) => {
                ErrorCategory::Internal
            },
        }
    }
}

// ============================================================================
// Workspace error trait
// ============================================================================

/// Error category enum - used for classification and log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    // Infrastructure layer
    Configuration,
    Timeout,

    // Operator input layer
    Validation,
    NotFound,

    // Link layer
    Protocol,
    Connection,
    DataCorruption,

    // System level
    Internal,
}

/// Common error capability trait
///
/// Every crate's error type implements this so the binaries can classify,
/// log and summarize failures uniformly.
pub trait ConsoleErrorTrait: std::error::Error + Send + Sync + 'static {
    /// Get error code (for logs and status output)
    fn error_code(&self) -> &'static str;

    /// Get error category
    fn category(&self) -> ErrorCategory;

    /// Whether the error is retryable (default implementation is category-based)
    fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Connection | ErrorCategory::Timeout | ErrorCategory::Protocol
        )
    }

    /// Get log level
    fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self.category() {
            ErrorCategory::Internal | ErrorCategory::Configuration => Level::ERROR,
            ErrorCategory::Timeout | ErrorCategory::Connection | ErrorCategory::Protocol => {
                Level::WARN
            },
            ErrorCategory::Validation | ErrorCategory::NotFound => Level::INFO,
            ErrorCategory::DataCorruption => Level::DEBUG,
        }
    }
}

//! Common command-line arguments for the console binaries
//!
//! Provides a unified argument structure that each binary flattens into its own
//! `Parser` and extends with subcommands.

use std::path::PathBuf;

#[cfg(feature = "cli")]
use clap::Args;

use crate::logging::LogConfig;

/// Common startup arguments
///
/// Shared options for logging and configuration discovery.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(Args))]
pub struct ServiceArgs {
    /// Log level (trace, debug, info, warn, error)
    #[cfg_attr(
        feature = "cli",
        arg(short = 'l', long, default_value = "info", env = "RUST_LOG", global = true)
    )]
    pub log_level: String,

    /// Disable colored output (useful when piping to a file)
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub no_color: bool,

    /// Also write logs to daily rolling files in this directory
    #[cfg_attr(feature = "cli", arg(long, env = "CHILLER_LOG_DIR", global = true))]
    pub log_dir: Option<PathBuf>,

    /// Emit file logs as JSON lines
    #[cfg_attr(feature = "cli", arg(long, global = true))]
    pub json_logs: bool,

    /// Explicit configuration file (yaml, toml or json)
    #[cfg_attr(feature = "cli", arg(short = 'c', long, env = "CHILLER_CONFIG", global = true))]
    pub config: Option<PathBuf>,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            no_color: false,
            log_dir: None,
            json_logs: false,
            config: None,
        }
    }
}

impl ServiceArgs {
    /// Parse log level string to tracing::Level
    pub fn parse_log_level(&self) -> tracing::Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" | "warning" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    /// Check if running with verbose diagnostics
    pub fn is_development(&self) -> bool {
        self.log_level == "debug" || self.log_level == "trace"
    }

    /// Build the logger configuration for `service_name`
    pub fn log_config(&self, service_name: &str) -> LogConfig {
        LogConfig {
            service_name: service_name.to_string(),
            log_dir: self.log_dir.clone(),
            console_level: self.parse_log_level(),
            enable_json: self.json_logs,
            ansi: !self.no_color,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = ServiceArgs::default();
        assert_eq!(args.log_level, "info");
        assert!(!args.no_color);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_parse_log_level() {
        let args = ServiceArgs {
            log_level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_log_level(), tracing::Level::DEBUG);

        let args = ServiceArgs {
            log_level: "WARN".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_log_level(), tracing::Level::WARN);

        let args = ServiceArgs {
            log_level: "invalid".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_log_config_mapping() {
        let args = ServiceArgs {
            log_level: "trace".to_string(),
            no_color: true,
            log_dir: Some(PathBuf::from("/tmp/chiller-logs")),
            json_logs: true,
            config: None,
        };
        assert!(args.is_development());

        let config = args.log_config("chillerlink");
        assert_eq!(config.service_name, "chillerlink");
        assert_eq!(config.console_level, tracing::Level::TRACE);
        assert!(!config.ansi);
        assert!(config.enable_json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/chiller-logs")));
    }
}

//! Link configuration
//!
//! Fixed at startup. Loaded through `common::config_loader` (defaults, then
//! `config/chillerlink.yaml`, then an explicit file, then `CHILLERLINK_*`
//! environment variables) and validated before the link starts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Service name used for config files, env prefix and log files
pub const SERVICE_NAME: &str = "chillerlink";

/// Default device path
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Default baud rate of the controller firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Device path (e.g. "/dev/ttyACM0", "COM3")
    pub port: String,
    /// Baud rate, 8N1 framing with no flow control
    pub baud_rate: u32,
    /// Upper bound on a single read
    pub read_timeout_ms: u64,
    /// Delay between a failed open (or read fault) and the next open attempt
    pub reconnect_backoff_ms: u64,
    /// Upper bound on a single command write
    pub write_timeout_ms: u64,
    /// Bytes requested per read
    pub read_chunk_size: usize,
    /// Longest accepted line, terminator excluded
    pub max_line_bytes: usize,
    /// Pause after an empty read; 0 retries at once since reads are bounded anyway
    pub idle_poll_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 100,
            reconnect_backoff_ms: 1000,
            write_timeout_ms: 1000,
            read_chunk_size: 256,
            max_line_bytes: 4096,
            idle_poll_ms: 50,
        }
    }
}

impl LinkConfig {
    /// Config for `port`, everything else default
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(LinkError::config("port cannot be empty"));
        }
        if self.baud_rate == 0 {
            return Err(LinkError::config("baud_rate must be greater than zero"));
        }
        if self.read_timeout_ms == 0 {
            return Err(LinkError::config("read_timeout_ms must be greater than zero"));
        }
        if self.reconnect_backoff_ms == 0 {
            return Err(LinkError::config(
                "reconnect_backoff_ms must be greater than zero",
            ));
        }
        if self.write_timeout_ms == 0 {
            return Err(LinkError::config("write_timeout_ms must be greater than zero"));
        }
        if self.read_chunk_size == 0 {
            return Err(LinkError::config("read_chunk_size must be greater than zero"));
        }
        if self.max_line_bytes < self.read_chunk_size {
            return Err(LinkError::config(format!(
                "max_line_bytes ({}) must be at least read_chunk_size ({})",
                self.max_line_bytes, self.read_chunk_size
            )));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }
}

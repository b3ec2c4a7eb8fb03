//! Connection manager
//!
//! Owns the device handle and serializes every device call. The handle lives
//! in one async mutex; reads, writes, opens and closes all take it, so no two
//! device calls ever overlap. Tokio's mutex is FIFO, so a writer queued behind
//! an in-flight read is served as soon as that read's timeout expires.
//!
//! A write that fails or times out may have left part of a command on the
//! wire. The handle is closed and the next delivered command is prefixed with
//! a bare terminator so the fragment ends up on a line of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use crate::command::COMMAND_TERMINATOR;
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::stats::LinkStats;
use crate::transport::{LinkPort, PortOpener};

/// Link connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type Handle = Option<Box<dyn LinkPort>>;

/// Opens, closes and guards the physical link
pub struct ConnectionManager {
    config: LinkConfig,
    opener: Arc<dyn PortOpener>,
    handle: Mutex<Handle>,
    state_tx: watch::Sender<ConnectionState>,
    stats: Arc<LinkStats>,
    /// A previous write may have stopped mid-line
    resync: AtomicBool,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("port", &self.config.port)
            .field("state", &self.state())
            .finish()
    }
}

impl ConnectionManager {
    pub fn new(config: LinkConfig, opener: Arc<dyn PortOpener>, stats: Arc<LinkStats>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            opener,
            handle: Mutex::new(None),
            state_tx,
            stats,
            resync: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Receiver for state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, next: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                debug!("Link state: {} -> {}", current, next);
                *current = next;
                true
            }
        });
    }

    /// Open the device if no handle is held
    pub async fn open(&self) -> Result<()> {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return Ok(());
        }

        self.set_state(ConnectionState::Connecting);
        self.stats.record_open_attempt();

        match self.opener.open(&self.config).await {
            Ok(port) => {
                info!(port = %self.config.port, baud = self.config.baud_rate, "Link connected");
                *handle = Some(port);
                self.stats.record_connection();
                self.set_state(ConnectionState::Connected);
                Ok(())
            },
            Err(e) => {
                warn!(port = %self.config.port, error = %e, "Link open failed");
                self.stats.record_open_failure();
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            },
        }
    }

    /// Read up to `max_bytes`, waiting at most the read timeout
    ///
    /// A timeout with no data is an empty result. An I/O error is returned as
    /// `TransientRead`; the handle is left for the caller to close.
    pub async fn read(&self, max_bytes: usize) -> Result<Vec<u8>> {
        let mut handle = self.handle.lock().await;
        let port = handle.as_mut().ok_or(LinkError::NotConnected)?;

        let mut buf = vec![0u8; max_bytes];
        match timeout(self.config.read_timeout(), port.read(&mut buf)).await {
            Err(_) => Ok(Vec::new()),
            Ok(Ok(n)) => {
                buf.truncate(n);
                if n > 0 {
                    self.stats.record_bytes_received(n);
                    trace!(bytes = n, "Link read");
                }
                Ok(buf)
            },
            Ok(Err(e)) => Err(LinkError::TransientRead(e.to_string())),
        }
    }

    /// Best-effort write of one encoded command
    ///
    /// Never fails: errors, timeouts and a missing handle are logged and
    /// counted as dropped commands. Returns whether the bytes were delivered.
    /// A failed or timed-out write closes the handle.
    pub async fn write(&self, bytes: &[u8]) -> bool {
        let mut handle = self.handle.lock().await;
        let Some(port) = handle.as_mut() else {
            debug!("Command dropped, link not connected");
            self.stats.record_command_dropped();
            return false;
        };

        let resync = self.resync.load(Ordering::SeqCst);
        let mut frame = Vec::with_capacity(bytes.len() + 1);
        if resync {
            frame.push(COMMAND_TERMINATOR);
        }
        frame.extend_from_slice(bytes);

        let outcome = match timeout(self.config.write_timeout(), port.write_all(&frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LinkError::WriteFailed(e.to_string())),
            Err(_) => Err(LinkError::WriteFailed(format!(
                "timed out after {:?}",
                self.config.write_timeout()
            ))),
        };

        match outcome {
            Ok(()) => {
                if resync {
                    self.resync.store(false, Ordering::SeqCst);
                }
                self.stats.record_command_sent(frame.len());
                debug!(command = %String::from_utf8_lossy(bytes).trim_end(), "Command sent");
                true
            },
            Err(e) => {
                warn!(port = %self.config.port, error = %e, "Command dropped, closing link");
                self.stats.record_command_dropped();
                self.stats.record_disconnection();
                self.resync.store(true, Ordering::SeqCst);
                self.close_locked(&mut *handle).await;
                false
            },
        }
    }

    /// Drop the handle and go `Disconnected`
    pub async fn close(&self) {
        let mut handle = self.handle.lock().await;
        self.close_locked(&mut *handle).await;
    }

    async fn close_locked(&self, handle: &mut Handle) {
        if let Some(mut port) = handle.take() {
            if let Err(e) = port.close().await {
                debug!(error = %e, "Error while closing {}", port.name());
            }
            info!(port = %self.config.port, "Link closed");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Close after a read fault
    pub async fn fault(&self, error: &LinkError) {
        warn!(port = %self.config.port, error = %error, "Link fault, reconnecting");
        self.stats.record_disconnection();
        self.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::transport::MockDevice;
    use std::time::Duration;

    fn manager(device: &MockDevice) -> ConnectionManager {
        ConnectionManager::new(
            LinkConfig::for_port("mock0"),
            Arc::new(device.opener()),
            Arc::new(LinkStats::new()),
        )
    }

    #[tokio::test]
    async fn test_open_and_close_transitions() {
        let device = MockDevice::new();
        let manager = manager(&device);
        let mut rx = manager.watch_state();
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        manager.open().await.unwrap();
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connected);
        assert_eq!(device.open_handles(), 1);

        // Already open: no second attempt
        manager.open().await.unwrap();
        assert_eq!(device.open_attempts().len(), 1);

        manager.close().await;
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(device.open_handles(), 0);
    }

    #[tokio::test]
    async fn test_failed_open_is_disconnected() {
        let device = MockDevice::new();
        device.set_unavailable(true);
        let manager = manager(&device);

        let err = manager.open().await.unwrap_err();
        assert!(matches!(err, LinkError::PortUnavailable { ref port, .. } if port == "mock0"));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(manager.stats.snapshot().open_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_is_empty() {
        let device = MockDevice::new();
        let manager = manager(&device);
        manager.open().await.unwrap();

        let started = tokio::time::Instant::now();
        let bytes = manager.read(64).await.unwrap();
        assert!(bytes.is_empty());
        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_read_fault_and_not_connected() {
        let device = MockDevice::new();
        let manager = manager(&device);
        assert_eq!(manager.read(8).await, Err(LinkError::NotConnected));

        manager.open().await.unwrap();
        device.push_fault("unplugged");
        assert!(matches!(
            manager.read(8).await,
            Err(LinkError::TransientRead(_))
        ));
    }

    #[tokio::test]
    async fn test_write_is_best_effort() {
        let device = MockDevice::new();
        let manager = manager(&device);

        // Not connected: dropped, no panic, no error
        assert!(!manager.write(b"RESET\n").await);

        manager.open().await.unwrap();
        assert!(manager.write(b"RESET\n").await);

        device.set_fail_writes(true);
        assert!(!manager.write(b"MODE AUTO\n").await);
        assert_eq!(manager.state(), ConnectionState::Disconnected);

        let stats = manager.stats.snapshot();
        assert_eq!(stats.commands_sent, 1);
        assert_eq!(stats.commands_dropped, 2);
        assert_eq!(device.written(), b"RESET\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wedged_write_times_out() {
        let device = MockDevice::new();
        device.set_write_delay(Duration::from_secs(30));
        let manager = manager(&device);
        manager.open().await.unwrap();

        let started = tokio::time::Instant::now();
        assert!(!manager.write(b"RESET\n").await);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));
        assert!(device.written().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_write_closes_and_resyncs() {
        let device = MockDevice::new();
        let manager = manager(&device);
        manager.open().await.unwrap();

        // Half a command goes out, then the device stops accepting bytes
        device.set_write_stall_after(Some(8));
        assert!(!manager.write(b"MODE SERVICE\n").await);
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert_eq!(device.open_handles(), 0);

        device.set_write_stall_after(None);
        manager.open().await.unwrap();
        assert!(manager.write(b"PUMP EVAP ON\n").await);
        assert!(manager.write(b"RESET\n").await);

        // The fragment is terminated on its own line; later commands are intact
        assert_eq!(device.written(), b"MODE SER\nPUMP EVAP ON\nRESET\n");
        let stats = manager.stats.snapshot();
        assert_eq!(stats.commands_dropped, 1);
        assert_eq!(stats.disconnections, 1);
    }
}

//! Link driver
//!
//! [`LinkContext`] bundles everything one link needs: the connection manager,
//! the telemetry store, the counters and the shutdown token. The driver task
//! loops read → frame → decode → publish; commands are submitted from any
//! other task through the same context and share the connection lock.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::command::CommandEncoder;
use crate::config::LinkConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::error::{LinkError, Result};
use crate::framer::{FrameEvent, LineFramer};
use crate::intent::Intent;
use crate::stats::{LinkStats, LinkStatsSnapshot};
use crate::store::SharedTelemetryStore;
use crate::telemetry::TelemetryDecoder;
use crate::transport::PortOpener;

/// Serializable link summary for status indicators
#[derive(Debug, Clone, Serialize)]
pub struct LinkStatus {
    pub port: String,
    pub state: ConnectionState,
    pub sequence: u64,
    /// Milliseconds since the last accepted record
    pub telemetry_age_ms: Option<u64>,
    pub stats: LinkStatsSnapshot,
}

/// Shared state of one serial link
#[derive(Debug)]
pub struct LinkContext {
    config: LinkConfig,
    connection: ConnectionManager,
    store: SharedTelemetryStore,
    stats: Arc<LinkStats>,
    shutdown: CancellationToken,
}

impl LinkContext {
    /// Validate `config` and build a context with its own shutdown token
    pub fn new(config: LinkConfig, opener: Arc<dyn PortOpener>) -> Result<Self> {
        Self::with_shutdown(config, opener, CancellationToken::new())
    }

    /// Build a context cancelled by `shutdown`
    pub fn with_shutdown(
        config: LinkConfig,
        opener: Arc<dyn PortOpener>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        config.validate()?;
        let stats = Arc::new(LinkStats::new());
        Ok(Self {
            connection: ConnectionManager::new(config.clone(), opener, Arc::clone(&stats)),
            config,
            store: SharedTelemetryStore::new(),
            stats,
            shutdown,
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn store(&self) -> &SharedTelemetryStore {
        &self.store
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ask the driver to stop
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn status(&self) -> LinkStatus {
        LinkStatus {
            port: self.config.port.clone(),
            state: self.connection.state(),
            sequence: self.store.sequence(),
            telemetry_age_ms: self.store.age().map(|age| age.as_millis() as u64),
            stats: self.stats.snapshot(),
        }
    }

    /// Encode and send one command line
    ///
    /// Fire-and-forget: never fails. Returns whether bytes reached the device;
    /// empty input sends nothing and returns `false`. A write still pending
    /// at shutdown is abandoned so it cannot hold the link lock.
    pub async fn submit(&self, text: &str) -> bool {
        match CommandEncoder::encode(text) {
            Some(bytes) => {
                tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => {
                        debug!("Command abandoned at shutdown");
                        self.stats.record_command_dropped();
                        false
                    },
                    sent = self.connection.write(&bytes) => sent,
                }
            },
            None => {
                trace!("Empty command ignored");
                self.stats.record_command_ignored();
                false
            },
        }
    }

    /// Send the command line for `intent`
    pub async fn submit_intent(&self, intent: &Intent) -> bool {
        self.submit(&intent.to_command()).await
    }

    /// Wait until the link is connected, up to `limit`
    pub async fn wait_connected(&self, limit: Duration) -> bool {
        let mut rx = self.connection.watch_state();
        let connected = async {
            rx.wait_for(|s| *s == ConnectionState::Connected)
                .await
                .is_ok()
        };
        tokio::select! {
            result = timeout(limit, connected) => result.unwrap_or(false),
            () = self.shutdown.cancelled() => false,
        }
    }

    /// Frame `bytes`, decode complete lines and publish valid records
    ///
    /// Returns the number of records accepted into the store.
    pub fn process_chunk(&self, framer: &mut LineFramer, bytes: &[u8]) -> usize {
        let mut accepted = 0;
        for event in framer.feed(bytes) {
            match event {
                FrameEvent::Line(line) => {
                    self.stats.record_line();
                    trace!(line = %line, "Telemetry line");
                    match TelemetryDecoder::decode(&line) {
                        Ok(record) => {
                            self.store.set(record);
                            self.stats.record_decoded();
                            accepted += 1;
                        },
                        Err(e) => {
                            self.stats.record_decode_error();
                            debug!(error = %e, "Dropped malformed line");
                        },
                    }
                },
                FrameEvent::Overflow => {
                    self.stats.record_overflow();
                    warn!(
                        "Inbound line exceeded {} bytes, discarded",
                        framer.max_line_bytes()
                    );
                },
            }
        }
        accepted
    }

    /// Wait for `period` unless shutdown comes first; `false` on shutdown
    async fn pause(&self, period: Duration) -> bool {
        tokio::select! {
            () = self.shutdown.cancelled() => false,
            () = sleep(period) => true,
        }
    }

    /// Driver loop; returns after shutdown with the link closed
    pub async fn run(self: Arc<Self>) {
        let mut framer = LineFramer::new(self.config.max_line_bytes);
        info!(port = %self.config.port, "Link driver started");

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            if !self.connection.is_connected() {
                framer.reset();
                let opened = tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => break,
                    result = self.connection.open() => result,
                };
                if opened.is_err() {
                    if !self.pause(self.config.reconnect_backoff()).await {
                        break;
                    }
                    continue;
                }
            }

            let read = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                result = self.connection.read(self.config.read_chunk_size) => result,
            };

            match read {
                Ok(bytes) if bytes.is_empty() => {
                    // Give queued writers the lock
                    if !self.pause(self.config.idle_poll()).await {
                        break;
                    }
                },
                Ok(bytes) => {
                    self.process_chunk(&mut framer, &bytes);
                },
                Err(LinkError::NotConnected) => {
                    // Closed underneath us; reopen on the next pass
                },
                Err(e) => {
                    self.connection.fault(&e).await;
                    framer.reset();
                    if !self.pause(self.config.reconnect_backoff()).await {
                        break;
                    }
                },
            }
        }

        self.connection.close().await;
        info!(port = %self.config.port, "Link driver stopped");
    }
}

/// Build a link context and start its driver task
pub fn spawn_link(
    config: LinkConfig,
    opener: Arc<dyn PortOpener>,
) -> Result<(Arc<LinkContext>, JoinHandle<()>)> {
    let context = Arc::new(LinkContext::new(config, opener)?);
    let handle = tokio::spawn(Arc::clone(&context).run());
    Ok((context, handle))
}

/// Like [`spawn_link`], stopping when `shutdown` is cancelled
pub fn spawn_link_with_shutdown(
    config: LinkConfig,
    opener: Arc<dyn PortOpener>,
    shutdown: CancellationToken,
) -> Result<(Arc<LinkContext>, JoinHandle<()>)> {
    let context = Arc::new(LinkContext::with_shutdown(config, opener, shutdown)?);
    let handle = tokio::spawn(Arc::clone(&context).run());
    Ok((context, handle))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::transport::MockDevice;
    use tracing_test::traced_test;

    fn context(device: &MockDevice) -> LinkContext {
        LinkContext::new(LinkConfig::for_port("mock0"), Arc::new(device.opener())).unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let device = MockDevice::new();
        let config = LinkConfig {
            baud_rate: 0,
            ..LinkConfig::for_port("mock0")
        };
        let err = LinkContext::new(config, Arc::new(device.opener())).unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }

    #[test]
    fn test_error_isolation() {
        let device = MockDevice::new();
        let ctx = context(&device);
        let mut framer = LineFramer::new(ctx.config().max_line_bytes);

        ctx.process_chunk(&mut framer, b"{\"EVAP_LWT_F\": 44.2}\n");
        let errors_before = ctx.stats().decode_errors();

        ctx.process_chunk(&mut framer, b"{\"EVAP_LWT_F\": 4\n");
        assert_eq!(ctx.stats().decode_errors(), errors_before + 1);
        // Store still holds the first record
        assert_eq!(ctx.store().record().get_f64("EVAP_LWT_F"), Some(44.2));

        ctx.process_chunk(&mut framer, b"{\"EVAP_LWT_F\": 45.0}\n");
        assert_eq!(ctx.store().record().get_f64("EVAP_LWT_F"), Some(45.0));
        assert_eq!(ctx.stats().decode_errors(), errors_before + 1);
    }

    #[test]
    fn test_chunked_record_is_assembled() {
        let device = MockDevice::new();
        let ctx = context(&device);
        let mut framer = LineFramer::new(ctx.config().max_line_bytes);

        assert_eq!(ctx.process_chunk(&mut framer, b"{\"P_SUC"), 0);
        assert_eq!(ctx.process_chunk(&mut framer, b"TION\": 61.5}\r"), 0);
        assert_eq!(ctx.process_chunk(&mut framer, b"\n"), 1);
        assert_eq!(ctx.store().record().get_f64("P_SUCTION"), Some(61.5));
        assert_eq!(ctx.stats().snapshot().lines_received, 1);
    }

    #[test]
    #[traced_test]
    fn test_overflow_is_counted_and_logged() {
        let device = MockDevice::new();
        let config = LinkConfig {
            read_chunk_size: 16,
            max_line_bytes: 32,
            ..LinkConfig::for_port("mock0")
        };
        let ctx = LinkContext::new(config, Arc::new(device.opener())).unwrap();
        let mut framer = LineFramer::new(ctx.config().max_line_bytes);

        assert_eq!(ctx.process_chunk(&mut framer, &[b'x'; 40]), 0);
        assert_eq!(ctx.process_chunk(&mut framer, b"tail\n{\"SP_LWT\": 44.0}\n"), 1);

        let stats = ctx.stats().snapshot();
        assert_eq!(stats.buffer_overflows, 1);
        assert_eq!(stats.decode_errors, 1);
        assert!(logs_contain("exceeded 32 bytes"));
    }

    #[tokio::test]
    async fn test_empty_command_is_noop() {
        let device = MockDevice::new();
        let ctx = context(&device);
        ctx.connection().open().await.unwrap();

        assert!(!ctx.submit("").await);
        assert!(!ctx.submit("   ").await);
        assert!(device.writes().is_empty());

        let stats = ctx.stats().snapshot();
        assert_eq!(stats.commands_ignored, 2);
        assert_eq!(stats.commands_dropped, 0);
    }

    #[tokio::test]
    async fn test_submit_intent_writes_grammar_line() {
        let device = MockDevice::new();
        let ctx = context(&device);
        ctx.connection().open().await.unwrap();

        assert!(ctx.submit_intent(&Intent::SetpointLwt(44.0)).await);
        assert_eq!(device.written(), b"SP LWT 44.00\n");
    }

    #[test]
    fn test_status_serializes() {
        let device = MockDevice::new();
        let ctx = context(&device);
        let json = serde_json::to_value(ctx.status()).unwrap();
        assert_eq!(json["state"], "Disconnected");
        assert_eq!(json["port"], "mock0");
        assert_eq!(json["sequence"], 0);
        assert!(json["telemetry_age_ms"].is_null());
    }
}

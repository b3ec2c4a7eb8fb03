//! Mock Transport Implementation
//!
//! In-memory device for exercising the link without hardware. A [`MockDevice`]
//! is the shared "far end": tests script inbound bytes and faults on it and
//! inspect what the link wrote. [`MockOpener`] hands out [`MockPort`] handles
//! that all talk to the same device.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use super::traits::{LinkPort, PortOpener};
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

#[derive(Debug)]
enum Inbound {
    Data(Vec<u8>),
    Fault(String),
}

#[derive(Debug, Default)]
struct MockState {
    inbound: VecDeque<Inbound>,
    writes: Vec<Vec<u8>>,
    open_attempts: Vec<Instant>,
    fail_next_opens: usize,
    unavailable: bool,
    fail_writes: bool,
    read_delay: Duration,
    write_delay: Duration,
    write_stall_after: Option<usize>,
    opened: usize,
    closed: usize,
}

/// Shared far end of the mock link
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
    data_ready: Arc<Notify>,
    in_flight: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opener whose ports all belong to this device
    pub fn opener(&self) -> MockOpener {
        MockOpener {
            device: self.clone(),
        }
    }

    /// Queue raw bytes; one read returns at most one queued chunk
    pub fn push_bytes(&self, bytes: impl Into<Vec<u8>>) {
        self.state.lock().inbound.push_back(Inbound::Data(bytes.into()));
        self.data_ready.notify_one();
    }

    /// Queue `line` followed by `\n`
    pub fn push_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.push_bytes(bytes);
    }

    /// Queue an I/O fault; the read that reaches it fails
    pub fn push_fault(&self, reason: &str) {
        self.state
            .lock()
            .inbound
            .push_back(Inbound::Fault(reason.to_string()));
        self.data_ready.notify_one();
    }

    /// Fail the next `n` open attempts
    pub fn fail_next_opens(&self, n: usize) {
        self.state.lock().fail_next_opens = n;
    }

    /// Fail every open attempt until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Time each read holds the device once data is available
    pub fn set_read_delay(&self, delay: Duration) {
        self.state.lock().read_delay = delay;
    }

    /// Time each write holds the device
    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = delay;
    }

    /// Accept only the first `n` bytes of each write, then hang
    pub fn set_write_stall_after(&self, n: Option<usize>) {
        self.state.lock().write_stall_after = n;
    }

    /// Every write, in arrival order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// All written bytes concatenated
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().writes.concat()
    }

    /// Instants of every open attempt, successful or not
    pub fn open_attempts(&self) -> Vec<Instant> {
        self.state.lock().open_attempts.clone()
    }

    /// Handles that have been opened and not yet dropped
    pub fn open_handles(&self) -> usize {
        let state = self.state.lock();
        state.opened - state.closed
    }

    /// Times a device call started while another was still running
    pub fn overlap_count(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn pending_inbound(&self) -> usize {
        self.state.lock().inbound.len()
    }

    fn enter(&self) -> CallGuard {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        CallGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

/// Marks a device call in flight until dropped
struct CallGuard {
    in_flight: Arc<AtomicBool>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

/// Handle onto a [`MockDevice`]
#[derive(Debug)]
pub struct MockPort {
    device: MockDevice,
}

impl Drop for MockPort {
    fn drop(&mut self) {
        self.device.state.lock().closed += 1;
    }
}

#[async_trait]
impl LinkPort for MockPort {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let _guard = self.device.enter();
        loop {
            let (next, delay) = {
                let mut state = self.device.state.lock();
                (state.inbound.pop_front(), state.read_delay)
            };
            match next {
                Some(Inbound::Data(mut data)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        let rest = data.split_off(n);
                        self.device
                            .state
                            .lock()
                            .inbound
                            .push_front(Inbound::Data(rest));
                        self.device.data_ready.notify_one();
                    }
                    return Ok(n);
                },
                Some(Inbound::Fault(reason)) => {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, reason));
                },
                // Block like an idle serial line; the caller's timeout ends the wait
                None => self.device.data_ready.notified().await,
            }
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let _guard = self.device.enter();
        let (delay, fail, stall_after) = {
            let state = self.device.state.lock();
            (state.write_delay, state.fail_writes, state.write_stall_after)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        if let Some(n) = stall_after {
            let n = n.min(data.len());
            self.device.state.lock().writes.push(data[..n].to_vec());
            std::future::pending::<()>().await;
        }
        self.device.state.lock().writes.push(data.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Opener for [`MockPort`]s
#[derive(Debug, Clone)]
pub struct MockOpener {
    device: MockDevice,
}

#[async_trait]
impl PortOpener for MockOpener {
    async fn open(&self, config: &LinkConfig) -> Result<Box<dyn LinkPort>> {
        let mut state = self.device.state.lock();
        state.open_attempts.push(Instant::now());

        if state.unavailable {
            return Err(LinkError::port_unavailable(&config.port, "mock device unavailable"));
        }
        if state.fail_next_opens > 0 {
            state.fail_next_opens -= 1;
            return Err(LinkError::port_unavailable(&config.port, "mock open failure"));
        }

        state.opened += 1;
        debug!("Mock port opened ({} total)", state.opened);
        Ok(Box::new(MockPort {
            device: self.device.clone(),
        }))
    }
}

//! Transport Layer Traits
//!
//! The link talks to the physical device only through these two traits, so the
//! connection manager and driver loop run unchanged against a real serial port
//! or the in-memory mock.

use std::fmt;
use std::io;

use async_trait::async_trait;

use crate::config::LinkConfig;
use crate::error::Result;

/// An open, byte-oriented device handle
///
/// Implementations need not be internally synchronized: the connection manager
/// serializes every call behind one mutex.
#[async_trait]
pub trait LinkPort: Send + fmt::Debug {
    /// Read up to `buf.len()` bytes. May wait for data; the caller bounds the
    /// wait. `Ok(0)` means nothing was available.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write every byte of `data` and flush
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Release the device. Dropping the handle must also release it.
    async fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Human readable name for logs
    fn name(&self) -> &str;
}

/// Opens [`LinkPort`]s from the link configuration
#[async_trait]
pub trait PortOpener: Send + Sync {
    /// Open the device named by `config`, or fail with `PortUnavailable`
    async fn open(&self, config: &LinkConfig) -> Result<Box<dyn LinkPort>>;
}

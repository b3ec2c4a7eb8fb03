//! Serial Transport Implementation
//!
//! `tokio-serial` backed device handle. The controller firmware speaks 8N1
//! without flow control; only the path and baud rate are configurable.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tracing::{debug, info};

use super::traits::{LinkPort, PortOpener};
use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

/// Open serial device
pub struct SerialLink {
    port: String,
    stream: SerialStream,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink").field("port", &self.port).finish()
    }
}

#[async_trait]
impl LinkPort for SerialLink {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read(buf).await {
            Ok(n) => Ok(n),
            // Some drivers report an idle line as a timeout instead of Ok(0)
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        // The descriptor is released when the stream drops
        info!("Closed serial port: {}", self.port);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.port
    }
}

/// Production opener for [`SerialLink`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

#[async_trait]
impl PortOpener for SerialOpener {
    async fn open(&self, config: &LinkConfig) -> Result<Box<dyn LinkPort>> {
        debug!("Opening serial port: {} @ {}", config.port, config.baud_rate);

        let stream = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout())
            .open_native_async()
            .map_err(|e| LinkError::port_unavailable(&config.port, e))?;

        Ok(Box::new(SerialLink {
            port: config.port.clone(),
            stream,
        }))
    }
}

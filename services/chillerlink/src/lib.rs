//! Chiller console serial link (chillerlink)
//!
//! Hosts the link between the operator console and the chiller controller
//! board: newline-delimited JSON telemetry comes in, plain-text command lines
//! go out, over one serial port.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  bytes  ┌──────────────┐  lines  ┌──────────────────┐
//! │  LinkPort    │────────►│  LineFramer  │────────►│ TelemetryDecoder │
//! │ (serial/mock)│         └──────────────┘         └──────────────────┘
//! └──────────────┘                                           │ record
//!        ▲                                                   ▼
//!        │ encoded line  ┌──────────────────┐      ┌──────────────────────┐
//!        └───────────────│ ConnectionManager│      │ SharedTelemetryStore │
//!                        │ (one lock, FIFO) │      │ (latest snapshot)    │
//!                        └──────────────────┘      └──────────────────────┘
//!                                 ▲ CommandEncoder          │ get()
//!                                 │                         ▼
//!                          submit / Intent              UI / CLI
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chillerlink::{spawn_link, LinkConfig, SerialOpener};
//!
//! # async fn demo() -> chillerlink::error::Result<()> {
//! let (link, driver) = spawn_link(LinkConfig::for_port("/dev/ttyACM0"), Arc::new(SerialOpener))?;
//!
//! link.submit("PUMP EVAP ON").await;
//! let lwt = link.store().record().get_f64("EVAP_LWT_F");
//! println!("leaving water: {:?}", lwt);
//!
//! link.shutdown();
//! let _ = driver.await;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod command;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod framer;
pub mod intent;
pub mod stats;
pub mod store;
pub mod telemetry;
pub mod transport;

pub use command::CommandEncoder;
pub use config::LinkConfig;
pub use connection::{ConnectionManager, ConnectionState};
pub use driver::{spawn_link, spawn_link_with_shutdown, LinkContext, LinkStatus};
pub use error::{LinkError, Result};
pub use framer::{FrameEvent, LineFramer};
pub use intent::{find_preset, Intent, Preset, PRESETS};
pub use stats::{LinkStats, LinkStatsSnapshot};
pub use store::{SharedTelemetryStore, TelemetrySnapshot};
pub use telemetry::{TelemetryDecoder, TelemetryRecord, TelemetryValue};
pub use transport::{LinkPort, MockDevice, PortOpener, SerialOpener};

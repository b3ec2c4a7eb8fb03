//! Transport Layer Module
//!
//! Separates the physical device from the link logic:
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │   ConnectionManager / driver loop    │
//! └──────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌──────────────────────────────────────┐
//! │  PortOpener::open → Box<dyn LinkPort>│
//! └──────────────────────────────────────┘
//!          │                    │
//!          ▼                    ▼
//!   ┌─────────────┐      ┌─────────────┐
//!   │ SerialLink  │      │  MockPort   │
//!   │(tokio-serial│      │ (in-memory) │
//!   └─────────────┘      └─────────────┘
//! ```

pub mod mock;
pub mod serial;
pub mod traits;

pub use mock::{MockDevice, MockOpener, MockPort};
pub use serial::{SerialLink, SerialOpener};
pub use traits::{LinkPort, PortOpener};

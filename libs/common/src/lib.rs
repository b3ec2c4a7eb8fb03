//! Chiller console basic library
//!
//! Provides functions shared by the console crates:
//! - logging bootstrap
//! - layered configuration loading
//! - graceful shutdown signal handling
//! - common command-line arguments

pub mod bootstrap_args;
pub mod config_loader;
pub mod error;
pub mod logging;
pub mod shutdown;

pub use error::{Error, Result};

// Re-export common dependencies
pub use serde;
pub use serde_json;
pub use tokio;

// Re-export CLI dependencies when cli feature is enabled
#[cfg(feature = "cli")]
pub use clap;

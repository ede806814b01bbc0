//! Slidecast Common Utilities
//!
//! Shared infrastructure for all Slidecast crates:
//! - Error taxonomy and result alias
//! - Tick time model and decimal-seconds conversion
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use config::*;
pub use error::*;
pub use time::*;

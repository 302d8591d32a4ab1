//! AutoGain Common Utilities
//!
//! Shared infrastructure for all AutoGain crates:
//! - Error types and result aliases
//! - Clock conversions and polling-rate measurement
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;

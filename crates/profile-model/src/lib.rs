//! AutoGain Profile Model
//!
//! Defines the data contracts shared by the controller and its hosts:
//! - **Samples:** Timestamped relative motion reports from a pointing device
//! - **Curves:** The per-speed-bin gain lookup table
//! - **Profiles:** Per-device calibration plus curve, and their text format
//! - **Stores:** Where profiles are persisted (`CurveStore`)
//!
//! Speeds are in metres per second; distances in metres unless a field says
//! otherwise.

pub mod profile;
pub mod sample;
pub mod store;

pub use profile::*;
pub use sample::*;
pub use store::*;

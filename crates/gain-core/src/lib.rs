//! AutoGain Gain Core
//!
//! Translates device motion into display motion through a learned,
//! per-speed-bin gain curve, and refines that curve after every click:
//! - **Translation:** Hot-path gain lookup for each motion report
//! - **Kinematics:** Resampled, smoothed trajectories from a sample window
//! - **Segmentation:** Persistence-filtered speed extrema into submovements
//! - **Classification:** Clutching, unaimed, interrupted, ballistic
//! - **Learning:** Aim-point filtering and per-bin curve updates
//!
//! Everything below the session layer is pure computation. Sessions reach
//! storage only through the `CurveStore` trait.

pub mod adapter;
pub mod aim_point;
pub mod extrema;
pub mod filter;
pub mod interpolate;
pub mod kinematics;
pub mod session;
pub mod submovement;
pub mod translator;
pub mod window;

pub use adapter::{GainAdapter, LearningOutcome, LearningReport, LearningScratch, SkipReason};
pub use aim_point::AimPointEstimator;
pub use session::{DeviceSession, DeviceStatus, SessionRegistry, SessionState};
pub use translator::translate;
pub use window::EventWindow;

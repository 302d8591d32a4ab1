//! Gain-curve learning from a completed click gesture.
//!
//! # Algorithm
//!
//! 1. Rebuild the gesture's kinematics from the drained window and segment
//!    the smoothed display speed at its persistent extrema.
//! 2. Classify submovements; give up quietly unless at least two aimed ones
//!    follow the dominant submovement's start.
//! 3. Walk the scored submovements from the most recent back to the dominant
//!    one. Clean ballistic ones update the aim point; every aimed one yields
//!    a longitudinal error (the aim-point share of the target distance for
//!    ballistic ones, the whole distance for fine corrections) minus the
//!    distance actually covered.
//! 4. Spread `learning_rate × error` over the motor-speed bins the
//!    submovement visited, smooth it with the kinematic kernel and add it to
//!    the curve, clamping at zero. The dead-band is never touched.

use std::fmt;

use autogain_common::config::LearningConfig;
use autogain_profile_model::{DeviceProfile, GainCurve, MotionSample, BIN_COUNT};
use serde::Serialize;

use crate::aim_point::AimPointEstimator;
use crate::extrema::find_extrema;
use crate::filter::smooth_into;
use crate::kinematics::KinematicExtractor;
use crate::submovement::{classify, ClassifierParams};

/// Why a learning pass left the curve alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Learning is switched off.
    Disabled,
    /// The window held no samples.
    EmptyWindow,
    /// Fewer than two minima or maxima survived.
    TooFewExtrema { minima: usize, maxima: usize },
    /// Fewer than two aimed submovements from the dominant one onward.
    TooFewAimed { aimed: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "learning disabled"),
            Self::EmptyWindow => write!(f, "empty window"),
            Self::TooFewExtrema { minima, maxima } => {
                write!(f, "too few extrema ({minima} minima, {maxima} maxima)")
            }
            Self::TooFewAimed { aimed } => write!(f, "too few aimed submovements ({aimed})"),
        }
    }
}

/// What a completed learning pass did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningReport {
    /// Submovements found in the window.
    pub submovements: usize,
    /// Aimed submovements that contributed an error.
    pub scored: usize,
    /// Aim-point observations folded in.
    pub aim_updates: usize,
    /// Aim point after the pass.
    pub aim_point: f64,
    /// Bins marked by at least one scored submovement, ascending.
    pub touched_bins: Vec<usize>,
    /// Bins whose value differs from before the pass.
    pub changed_bins: usize,
}

impl LearningReport {
    pub fn changed(&self) -> bool {
        self.changed_bins > 0
    }
}

/// Result of one learning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningOutcome {
    Skipped(SkipReason),
    Applied(LearningReport),
}

impl LearningOutcome {
    /// Whether the curve changed.
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied(report) if report.changed())
    }
}

/// Per-pass accumulators, reset before each submovement.
#[derive(Debug, Clone)]
pub struct LearningScratch {
    gain_changes: Vec<f64>,
    smoothed: Vec<f64>,
    bin_seen: Vec<bool>,
    touched: Vec<bool>,
}

impl Default for LearningScratch {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningScratch {
    pub fn new() -> Self {
        Self {
            gain_changes: vec![0.0; BIN_COUNT],
            smoothed: vec![0.0; BIN_COUNT],
            bin_seen: vec![false; BIN_COUNT],
            touched: vec![false; BIN_COUNT],
        }
    }

    fn reset_submovement(&mut self) {
        self.gain_changes.fill(0.0);
        self.smoothed.fill(0.0);
        self.bin_seen.fill(false);
    }

    fn reset(&mut self) {
        self.reset_submovement();
        self.touched.fill(false);
    }
}

/// Learns a device's gain curve from click-terminated sample windows.
#[derive(Debug, Clone)]
pub struct GainAdapter {
    config: LearningConfig,
    params: ClassifierParams,
}

impl GainAdapter {
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            config: config.clone(),
            params: ClassifierParams::from(config),
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    /// Run one learning pass over `samples`, updating `profile.curve` and `aim`.
    pub fn learn(
        &self,
        samples: &[MotionSample],
        profile: &mut DeviceProfile,
        aim: &mut AimPointEstimator,
        scratch: &mut LearningScratch,
    ) -> LearningOutcome {
        if !self.config.enabled {
            return LearningOutcome::Skipped(SkipReason::Disabled);
        }

        let kinematics =
            KinematicExtractor::new(profile, self.config.resample_factor).extract(samples);
        if kinematics.is_empty() {
            return LearningOutcome::Skipped(SkipReason::EmptyWindow);
        }

        let extrema = find_extrema(&kinematics.speed, self.config.persistence_threshold);
        let too_few_extrema = SkipReason::TooFewExtrema {
            minima: extrema.minima.len(),
            maxima: extrema.maxima.len(),
        };
        if !extrema.is_usable() {
            return LearningOutcome::Skipped(too_few_extrema);
        }
        let Some(segmentation) = classify(&extrema, &kinematics, &self.params) else {
            return LearningOutcome::Skipped(too_few_extrema);
        };

        let aimed = segmentation.aimed_count();
        if aimed < 2 {
            return LearningOutcome::Skipped(SkipReason::TooFewAimed { aimed });
        }

        let before = profile.curve.clone();
        let mut scored = 0;
        let mut aim_updates = 0;
        scratch.reset();

        for sub in segmentation.scored().iter().rev() {
            if sub.unaimed {
                continue;
            }
            let geometry = &sub.geometry;

            let error = if sub.ballistic {
                if !sub.clutching && !sub.interrupted {
                    if let Some(ratio) = geometry.overshoot_ratio() {
                        aim.update(ratio);
                        aim_updates += 1;
                    }
                }
                geometry.longitudinal_error(aim.aim_point())
            } else {
                geometry.longitudinal_error(1.0)
            };
            let delta = self.config.learning_rate * error;

            scratch.reset_submovement();
            for &speed in &kinematics.input_speed[sub.start..=sub.end] {
                let bin = GainCurve::speed_bin(speed);
                if bin == 0 || scratch.bin_seen[bin] {
                    continue;
                }
                scratch.bin_seen[bin] = true;
                scratch.touched[bin] = true;
                scratch.gain_changes[bin] += delta;
            }
            smooth_into(&scratch.gain_changes, &mut scratch.smoothed);
            profile.curve.apply_delta(&scratch.smoothed);
            scored += 1;

            tracing::trace!(
                start = sub.start,
                end = sub.end,
                ballistic = sub.ballistic,
                error_m = error,
                "Submovement scored"
            );
        }

        let touched_bins = scratch
            .touched
            .iter()
            .enumerate()
            .filter_map(|(bin, &t)| t.then_some(bin))
            .collect();
        let changed_bins = before
            .values()
            .iter()
            .zip(profile.curve.values())
            .filter(|(a, b)| a != b)
            .count();
        scratch.reset();

        LearningOutcome::Applied(LearningReport {
            submovements: segmentation.submovements.len(),
            scored,
            aim_updates,
            aim_point: aim.aim_point(),
            touched_bins,
            changed_bins,
        })
    }
}

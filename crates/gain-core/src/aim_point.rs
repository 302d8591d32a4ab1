//! Aim-point estimation.
//!
//! A scalar Kalman filter tracking the fraction of the target distance a
//! ballistic submovement covers. The gain is fixed by the noise constants and
//! the predict step inflates the error by the sensor noise; the estimate
//! therefore moves a constant fraction of the innovation on every update.

use serde::{Deserialize, Serialize};

/// Process noise.
pub const PROCESS_NOISE: f64 = 0.2;

/// Sensor noise.
pub const SENSOR_NOISE: f64 = 40.0;

/// Aim point before any observation.
pub const INITIAL_AIM_POINT: f64 = 0.95;

/// Estimated error before any observation.
pub const INITIAL_ERROR: f64 = 1.0;

/// Filter state for one device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimPointEstimator {
    x: f64,
    p: f64,
}

impl Default for AimPointEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl AimPointEstimator {
    pub fn new() -> Self {
        Self {
            x: INITIAL_AIM_POINT,
            p: INITIAL_ERROR,
        }
    }

    /// Filter gain applied to every innovation.
    pub fn gain() -> f64 {
        PROCESS_NOISE / (PROCESS_NOISE + SENSOR_NOISE)
    }

    /// Fold in an observed overshoot ratio and return the new aim point.
    ///
    /// Non-finite observations leave the state untouched.
    pub fn update(&mut self, ratio: f64) -> f64 {
        if !ratio.is_finite() {
            return self.x;
        }
        self.p += SENSOR_NOISE;
        let k = Self::gain();
        self.x += k * (ratio - self.x);
        self.p *= 1.0 - k;
        self.x
    }

    /// Current aim point.
    pub fn aim_point(&self) -> f64 {
        self.x
    }

    /// Current estimated error.
    pub fn estimated_error(&self) -> f64 {
        self.p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let estimator = AimPointEstimator::new();
        assert_eq!(estimator.aim_point(), 0.95);
        assert_eq!(estimator.estimated_error(), 1.0);
    }

    #[test]
    fn test_converges_monotonically_without_overshoot() {
        let mut estimator = AimPointEstimator::new();
        let mut previous = estimator.aim_point();
        for _ in 0..2_000 {
            let x = estimator.update(0.9);
            assert!(x < previous);
            assert!(x > 0.9);
            previous = x;
        }
        assert!((previous - 0.9).abs() < 1e-3);
    }

    #[test]
    fn test_single_step() {
        let mut estimator = AimPointEstimator::new();
        let x = estimator.update(1.2);
        let k = 0.2 / 40.2;
        assert!((x - (0.95 + k * 0.25)).abs() < 1e-15);
        assert!((estimator.estimated_error() - 41.0 * (1.0 - k)).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_observation_is_ignored() {
        let mut estimator = AimPointEstimator::new();
        assert_eq!(estimator.update(f64::NAN), 0.95);
        assert_eq!(estimator, AimPointEstimator::new());
    }
}

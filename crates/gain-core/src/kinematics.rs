//! Kinematic reconstruction of a drained sample window.
//!
//! # Procedure
//!
//! 1. **Bucket** raw per-sample deltas into fixed time buckets (about three
//!    nominal sample periods). Each bucket yields a cumulative display
//!    position, a display (output) speed, a device (motor) speed, and its
//!    accumulated timespan.
//! 2. **Velocity** by central difference of position over bucket times,
//!    zero at both ends, then smoothed.
//! 3. **Acceleration** by central difference of smoothed velocity, smoothed
//!    again.
//! 4. **Speed** as the smoothed display speed, the series used for
//!    submovement segmentation.

use autogain_profile_model::{DeviceProfile, MotionSample};

use crate::filter::{central_difference, smooth};

/// Parallel per-bucket series extracted from one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kinematics {
    /// Time at the end of each bucket, from the start of the window (ms).
    pub time_ms: Vec<f64>,
    /// Accumulated inter-sample time inside each bucket (ms).
    pub timespan_ms: Vec<f64>,
    /// Cumulative display position (m).
    pub position_x: Vec<f64>,
    pub position_y: Vec<f64>,
    /// Unsmoothed display speed per bucket (m/s).
    pub output_speed: Vec<f64>,
    /// Unsmoothed device speed per bucket (m/s).
    pub input_speed: Vec<f64>,
    /// Smoothed display velocity (m/s).
    pub velocity_x: Vec<f64>,
    pub velocity_y: Vec<f64>,
    /// Smoothed display acceleration (m/s²).
    pub accel_x: Vec<f64>,
    pub accel_y: Vec<f64>,
    /// Smoothed display speed (m/s).
    pub speed: Vec<f64>,
}

impl Kinematics {
    pub fn len(&self) -> usize {
        self.time_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_ms.is_empty()
    }

    /// Display position at bucket `i`.
    pub fn position(&self, i: usize) -> (f64, f64) {
        (self.position_x[i], self.position_y[i])
    }

    /// Display position at the last bucket: where the click happened.
    pub fn target(&self) -> Option<(f64, f64)> {
        self.len().checked_sub(1).map(|last| self.position(last))
    }
}

#[derive(Debug, Default)]
struct Bucket {
    device_x: f64,
    device_y: f64,
    display_x: f64,
    display_y: f64,
    time_ms: f64,
    samples: usize,
}

/// Converts sample windows into [`Kinematics`] for one device.
#[derive(Debug, Clone)]
pub struct KinematicExtractor {
    bucket_ms: f64,
    nominal_period_ms: f64,
    counts_per_meter: f64,
    pixels_per_meter: f64,
}

impl KinematicExtractor {
    /// Extractor for `profile` with buckets of `resample_factor` nominal periods.
    pub fn new(profile: &DeviceProfile, resample_factor: f64) -> Self {
        let nominal_period_ms = profile.nominal_period_ms();
        Self {
            bucket_ms: nominal_period_ms * resample_factor,
            nominal_period_ms,
            counts_per_meter: profile.counts_per_meter(),
            pixels_per_meter: profile.pixels_per_meter(),
        }
    }

    /// Bucket length in milliseconds.
    pub fn bucket_ms(&self) -> f64 {
        self.bucket_ms
    }

    /// Extract kinematics from samples in delivery order.
    ///
    /// Returns empty series for an empty window.
    pub fn extract(&self, samples: &[MotionSample]) -> Kinematics {
        let mut k = Kinematics::default();
        if samples.is_empty() {
            return k;
        }

        let mut bucket = Bucket::default();
        let mut elapsed_ms = 0.0;
        let mut x = 0.0;
        let mut y = 0.0;

        for (i, sample) in samples.iter().enumerate() {
            let mut span = sanitize_span(sample.timespan_ms);
            if i == 0 {
                // The first gap measures the pause before the window.
                span = span.min(self.nominal_period_ms);
            }
            bucket.device_x += f64::from(sample.device_dx);
            bucket.device_y += f64::from(sample.device_dy);
            bucket.display_x += sample.display_dx;
            bucket.display_y += sample.display_dy;
            bucket.time_ms += span;
            bucket.samples += 1;

            if bucket.time_ms >= self.bucket_ms {
                self.emit(&mut k, &mut bucket, &mut elapsed_ms, &mut x, &mut y);
            }
        }
        if bucket.samples > 0 {
            self.emit(&mut k, &mut bucket, &mut elapsed_ms, &mut x, &mut y);
        }

        let time_s: Vec<f64> = k.time_ms.iter().map(|t| t / 1_000.0).collect();
        k.velocity_x = smooth(&central_difference(&k.position_x, &time_s));
        k.velocity_y = smooth(&central_difference(&k.position_y, &time_s));
        k.accel_x = smooth(&central_difference(&k.velocity_x, &time_s));
        k.accel_y = smooth(&central_difference(&k.velocity_y, &time_s));
        k.speed = smooth(&k.output_speed);
        k
    }

    fn emit(
        &self,
        k: &mut Kinematics,
        bucket: &mut Bucket,
        elapsed_ms: &mut f64,
        x: &mut f64,
        y: &mut f64,
    ) {
        let dx = bucket.display_x / self.pixels_per_meter;
        let dy = bucket.display_y / self.pixels_per_meter;
        *x += dx;
        *y += dy;
        *elapsed_ms += bucket.time_ms;

        let secs = bucket.time_ms / 1_000.0;
        let (output_speed, input_speed) = if secs > 0.0 {
            let device_m = bucket.device_x.hypot(bucket.device_y) / self.counts_per_meter;
            (dx.hypot(dy) / secs, device_m / secs)
        } else {
            (0.0, 0.0)
        };

        k.time_ms.push(*elapsed_ms);
        k.timespan_ms.push(bucket.time_ms);
        k.position_x.push(*x);
        k.position_y.push(*y);
        k.output_speed.push(output_speed);
        k.input_speed.push(input_speed);
        *bucket = Bucket::default();
    }
}

fn sanitize_span(span_ms: f64) -> f64 {
    if span_ms.is_finite() {
        span_ms.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1000 cpi, 100 ppi, 125 Hz: one count and one tenth of a pixel are
    /// both 25.4 µm.
    fn profile() -> DeviceProfile {
        DeviceProfile::new("dev", 125.0, 1000.0, 100.0, 1.0)
    }

    fn steady(n: usize, dx: i32) -> Vec<MotionSample> {
        (1..=n)
            .map(|i| {
                MotionSample::motion("dev", i as u64 * 8_000, dx, 0, 8.0)
                    .with_display(f64::from(dx) * 0.1, 0.0)
            })
            .collect()
    }

    #[test]
    fn test_empty_window() {
        let extractor = KinematicExtractor::new(&profile(), 3.0);
        let k = extractor.extract(&[]);
        assert!(k.is_empty());
        assert_eq!(k.target(), None);
    }

    #[test]
    fn test_bucket_length() {
        let extractor = KinematicExtractor::new(&profile(), 3.0);
        assert!((extractor.bucket_ms() - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_steady_motion() {
        let extractor = KinematicExtractor::new(&profile(), 3.0);
        // 40 counts per 8 ms = 40 * 25.4e-6 m / 0.008 s = 0.127 m/s
        let k = extractor.extract(&steady(30, 40));

        assert_eq!(k.len(), 10);
        for i in 0..k.len() {
            assert!((k.timespan_ms[i] - 24.0).abs() < 1e-9);
            assert!((k.output_speed[i] - 0.127).abs() < 1e-9);
            assert!((k.input_speed[i] - 0.127).abs() < 1e-9);
            assert!((k.speed[i] - 0.127).abs() < 1e-9);
        }
        // Interior velocity is the steady speed; ends are padded with zero
        // before smoothing.
        assert!((k.velocity_x[5] - 0.127).abs() < 1e-9);
        assert!(k.velocity_x[0] < 0.127);
        assert!(k.velocity_y.iter().all(|v| v.abs() < 1e-12));

        let (tx, ty) = k.target().unwrap();
        assert!((tx - 30.0 * 40.0 * 25.4e-6).abs() < 1e-12);
        assert_eq!(ty, 0.0);
    }

    #[test]
    fn test_trailing_partial_bucket_is_kept() {
        let extractor = KinematicExtractor::new(&profile(), 3.0);
        let k = extractor.extract(&steady(7, 10));
        assert_eq!(k.len(), 3);
        assert!((k.timespan_ms[2] - 8.0).abs() < 1e-9);
        let (tx, _) = k.target().unwrap();
        assert!((tx - 70.0 * 25.4e-6).abs() < 1e-12);
    }

    #[test]
    fn test_first_gap_is_capped() {
        let extractor = KinematicExtractor::new(&profile(), 3.0);
        let mut samples = steady(6, 10);
        samples[0].timespan_ms = 900.0;
        let k = extractor.extract(&samples);
        assert!(k.timespan_ms.iter().all(|span| *span <= 24.0 + 1e-9));
    }

    #[test]
    fn test_long_gap_inside_window_is_preserved() {
        let extractor = KinematicExtractor::new(&profile(), 3.0);
        let mut samples = steady(9, 10);
        samples[4].timespan_ms = 200.0;
        let k = extractor.extract(&samples);
        assert!(k.timespan_ms.iter().any(|span| *span >= 200.0));
    }

    #[test]
    fn test_acceleration_of_constant_velocity_is_small() {
        let extractor = KinematicExtractor::new(&profile(), 3.0);
        let k = extractor.extract(&steady(60, 40));
        let mid = k.len() / 2;
        assert!(k.accel_x[mid].abs() < 1e-6);
    }
}

//! Device-to-display translation, run on every motion report.
//!
//! Nothing here allocates, logs or blocks.

use autogain_profile_model::{GainCurve, BIN_SIZE, METERS_PER_INCH};

use crate::interpolate::interpolate;

/// Device speed of one report in m/s.
///
/// The timespan is raised to the nominal report period so duplicated or
/// delayed reports cannot produce runaway speeds.
pub fn motor_speed(dx: i32, dy: i32, timespan_ms: f64, cpi: f64, polling_rate_hz: f64) -> f64 {
    let nominal_ms = 1_000.0 / polling_rate_hz;
    let timespan_ms = if timespan_ms.is_finite() {
        timespan_ms.max(nominal_ms)
    } else {
        nominal_ms
    };
    let meters = f64::from(dx).hypot(f64::from(dy)) / (cpi / METERS_PER_INCH);
    let speed = meters / (timespan_ms / 1_000.0);
    if speed.is_finite() {
        speed
    } else {
        0.0
    }
}

/// Display pixels per device count at `speed_ms`.
pub fn gain_at(speed_ms: f64, curve: &GainCurve, cpi: f64, ppi: f64) -> f64 {
    interpolate(speed_ms / BIN_SIZE, curve.values()) * (ppi / cpi)
}

/// Translate one report into display pixels.
pub fn translate(
    dx: i32,
    dy: i32,
    timespan_ms: f64,
    curve: &GainCurve,
    cpi: f64,
    ppi: f64,
    polling_rate_hz: f64,
) -> (f64, f64) {
    let speed = motor_speed(dx, dy, timespan_ms, cpi, polling_rate_hz);
    let gain = gain_at(speed, curve, cpi, ppi);
    (f64::from(dx) * gain, f64::from(dy) * gain)
}

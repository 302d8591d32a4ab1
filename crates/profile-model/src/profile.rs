//! Gain curves and device profiles.
//!
//! A device profile ties a device identifier to its calibration (polling
//! rate, device counts per inch, display pixels per inch) and to the learned
//! gain curve. Profiles persist as plain text:
//!
//! ```text
//! line 1: device id
//! line 2: polling rate (Hz)
//! line 3: cpi
//! line 4: ppi
//! line 5: N (curve length)
//! lines 6..6+N-1: one gain value per line
//! ```

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Number of speed bins in a gain curve.
pub const BIN_COUNT: usize = 128;

/// Width of one speed bin in metres per second.
pub const BIN_SIZE: f64 = 0.005;

/// Gain held by bin 0, the dead-band.
pub const DEAD_BAND_GAIN: f64 = 0.0;

/// Metres per inch, for counts-per-inch and pixels-per-inch conversions.
pub const METERS_PER_INCH: f64 = 0.0254;

/// Per-speed-bin gain multipliers.
///
/// Always exactly [`BIN_COUNT`] finite, non-negative values. Bin 0 is the
/// dead-band and keeps its value through learning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct GainCurve {
    values: Vec<f64>,
}

impl GainCurve {
    /// A flat curve at `gain` with the dead-band pinned.
    pub fn flat(gain: f64) -> Self {
        let gain = if gain.is_finite() { gain.max(0.0) } else { 0.0 };
        let mut values = vec![gain; BIN_COUNT];
        values[0] = DEAD_BAND_GAIN;
        Self { values }
    }

    /// Build a curve from explicit values.
    pub fn from_values(values: Vec<f64>) -> Result<Self, ProfileError> {
        if values.len() != BIN_COUNT {
            return Err(ProfileError::invalid(format!(
                "curve must have {BIN_COUNT} bins, got {}",
                values.len()
            )));
        }
        if let Some((bin, value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && **v >= 0.0))
        {
            return Err(ProfileError::invalid(format!(
                "bin {bin} holds {value}, expected a finite non-negative gain"
            )));
        }
        Ok(Self { values })
    }

    /// Gain values, indexed by speed bin.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gain at `bin`, if it exists.
    pub fn get(&self, bin: usize) -> Option<f64> {
        self.values.get(bin).copied()
    }

    /// Lower speed edge of `bin` in m/s.
    pub fn bin_speed(bin: usize) -> f64 {
        bin as f64 * BIN_SIZE
    }

    /// Bin index for a speed: `ceil(speed / BIN_SIZE)`, clamped to the table.
    pub fn speed_bin(speed_ms: f64) -> usize {
        if !(speed_ms.is_finite() && speed_ms > 0.0) {
            return 0;
        }
        ((speed_ms / BIN_SIZE).ceil() as usize).min(BIN_COUNT - 1)
    }

    /// Add `delta` bin by bin, skipping the dead-band and clamping at zero.
    ///
    /// Returns the number of bins whose value changed.
    pub fn apply_delta(&mut self, delta: &[f64]) -> usize {
        let mut changed = 0;
        for (value, d) in self.values.iter_mut().zip(delta).skip(1) {
            if !d.is_finite() || *d == 0.0 {
                continue;
            }
            let updated = (*value + d).max(0.0);
            if updated != *value {
                *value = updated;
                changed += 1;
            }
        }
        changed
    }
}

impl TryFrom<Vec<f64>> for GainCurve {
    type Error = ProfileError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_values(values)
    }
}

impl From<GainCurve> for Vec<f64> {
    fn from(curve: GainCurve) -> Self {
        curve.values
    }
}

/// Calibration and learned curve for one physical device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Stable device identifier (for USB mice, `VID_PID`).
    pub device_id: String,

    /// Highest polling rate measured so far (Hz).
    pub polling_rate_hz: f64,

    /// Device counts per inch.
    pub cpi: f64,

    /// Display pixels per inch.
    pub ppi: f64,

    /// Learned gain curve.
    pub curve: GainCurve,
}

impl DeviceProfile {
    /// Create a profile with a flat curve at `default_gain`.
    pub fn new(
        device_id: impl Into<String>,
        polling_rate_hz: f64,
        cpi: f64,
        ppi: f64,
        default_gain: f64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            polling_rate_hz,
            cpi,
            ppi,
            curve: GainCurve::flat(default_gain),
        }
    }

    /// Replace the curve.
    pub fn with_curve(mut self, curve: GainCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Nominal interval between reports in milliseconds.
    pub fn nominal_period_ms(&self) -> f64 {
        1_000.0 / self.polling_rate_hz
    }

    /// Device counts per metre.
    pub fn counts_per_meter(&self) -> f64 {
        self.cpi / METERS_PER_INCH
    }

    /// Display pixels per metre.
    pub fn pixels_per_meter(&self) -> f64 {
        self.ppi / METERS_PER_INCH
    }

    /// Raise the polling rate if `measured_hz` is higher.
    ///
    /// Returns whether the profile changed. The rate never decreases.
    pub fn raise_polling_rate(&mut self, measured_hz: f64) -> bool {
        if measured_hz.is_finite() && measured_hz > self.polling_rate_hz {
            self.polling_rate_hz = measured_hz;
            true
        } else {
            false
        }
    }

    /// Render the persisted text form.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(64 + self.curve.len() * 24);
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}", self.device_id);
        let _ = writeln!(out, "{}", self.polling_rate_hz);
        let _ = writeln!(out, "{}", self.cpi);
        let _ = writeln!(out, "{}", self.ppi);
        let _ = writeln!(out, "{}", self.curve.len());
        for value in self.curve.values() {
            let _ = writeln!(out, "{value}");
        }
        out
    }

    /// Parse the persisted text form.
    pub fn from_text(text: &str) -> Result<Self, ProfileError> {
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }

        if lines.len() < 5 {
            return Err(ProfileError::malformed(
                lines.len() + 1,
                format!("expected at least 5 header lines, found {}", lines.len()),
            ));
        }

        let device_id = lines[0].trim();
        if device_id.is_empty() {
            return Err(ProfileError::malformed(1, "empty device id"));
        }

        let polling_rate_hz = parse_positive(lines[1], 2, "polling rate")?;
        let cpi = parse_positive(lines[2], 3, "cpi")?;
        let ppi = parse_positive(lines[3], 4, "ppi")?;

        let declared: usize = lines[4]
            .trim()
            .parse()
            .map_err(|e| ProfileError::malformed(5, format!("curve length: {e}")))?;
        let body = &lines[5..];
        if body.len() != declared {
            return Err(ProfileError::malformed(
                5,
                format!(
                    "curve length says {declared} values, found {}",
                    body.len()
                ),
            ));
        }

        let values = body
            .iter()
            .enumerate()
            .map(|(i, line)| {
                line.trim()
                    .parse::<f64>()
                    .map_err(|e| ProfileError::malformed(i + 6, format!("gain value: {e}")))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        Ok(Self {
            device_id: device_id.to_string(),
            polling_rate_hz,
            cpi,
            ppi,
            curve: GainCurve::from_values(values)?,
        })
    }
}

fn parse_positive(line: &str, line_no: usize, what: &str) -> Result<f64, ProfileError> {
    let value: f64 = line
        .trim()
        .parse()
        .map_err(|e| ProfileError::malformed(line_no, format!("{what}: {e}")))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ProfileError::invalid(format!(
            "{what} must be positive, got {value}"
        )))
    }
}

/// Errors that can occur when reading or writing profiles.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed profile at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Invalid profile: {message}")]
    Invalid { message: String },
}

impl ProfileError {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            line,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Whether the error describes file contents rather than I/O.
    pub fn is_corrupt(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_profile() -> DeviceProfile {
        DeviceProfile::new("046D_C077", 1000.0, 1600.0, 109.0, 1.25)
    }

    #[test]
    fn test_flat_curve_pins_dead_band() {
        let curve = GainCurve::flat(2.0);
        assert_eq!(curve.len(), BIN_COUNT);
        assert_eq!(curve.get(0), Some(DEAD_BAND_GAIN));
        assert!(curve.values()[1..].iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_from_values_rejects_wrong_length_and_negative() {
        assert!(GainCurve::from_values(vec![1.0; 10]).is_err());

        let mut values = vec![1.0; BIN_COUNT];
        values[7] = -0.1;
        assert!(matches!(
            GainCurve::from_values(values),
            Err(ProfileError::Invalid { .. })
        ));
    }

    #[test]
    fn test_speed_bin() {
        assert_eq!(GainCurve::speed_bin(0.0), 0);
        assert_eq!(GainCurve::speed_bin(0.001), 1);
        assert_eq!(GainCurve::speed_bin(0.0125), 3);
        assert_eq!(GainCurve::speed_bin(100.0), BIN_COUNT - 1);
        assert_eq!(GainCurve::speed_bin(f64::NAN), 0);
    }

    #[test]
    fn test_apply_delta_clamps_and_skips_dead_band() {
        let mut curve = GainCurve::flat(1.0);
        let mut delta = vec![0.0; BIN_COUNT];
        delta[0] = 5.0;
        delta[1] = -3.0;
        delta[2] = 0.5;
        let changed = curve.apply_delta(&delta);
        assert_eq!(changed, 2);
        assert_eq!(curve.get(0), Some(DEAD_BAND_GAIN));
        assert_eq!(curve.get(1), Some(0.0));
        assert_eq!(curve.get(2), Some(1.5));
    }

    #[test]
    fn test_raise_polling_rate_only_increases() {
        let mut profile = sample_profile();
        assert!(!profile.raise_polling_rate(500.0));
        assert!(!profile.raise_polling_rate(f64::INFINITY));
        assert!(profile.raise_polling_rate(2000.0));
        assert_eq!(profile.polling_rate_hz, 2000.0);
    }

    #[test]
    fn test_text_layout() {
        let text = sample_profile().to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "046D_C077");
        assert_eq!(lines[1], "1000");
        assert_eq!(lines[2], "1600");
        assert_eq!(lines[3], "109");
        assert_eq!(lines[4], "128");
        assert_eq!(lines.len(), 5 + BIN_COUNT);
        assert_eq!(lines[5], "0");
        assert_eq!(lines[6], "1.25");
    }

    #[test]
    fn test_from_text_rejects_short_file() {
        let err = DeviceProfile::from_text("dev\n125\n800\n").unwrap_err();
        assert!(matches!(err, ProfileError::Malformed { .. }));
        assert!(err.is_corrupt());
    }

    #[test]
    fn test_from_text_rejects_non_numeric_header() {
        let mut text = sample_profile().to_text();
        text = text.replacen("1600", "sixteen hundred", 1);
        let err = DeviceProfile::from_text(&text).unwrap_err();
        assert!(matches!(err, ProfileError::Malformed { line: 3, .. }));
    }

    #[test]
    fn test_from_text_rejects_count_mismatch() {
        let text = sample_profile().to_text();
        let truncated: String = text
            .lines()
            .take(5 + BIN_COUNT - 1)
            .map(|l| format!("{l}\n"))
            .collect();
        assert!(DeviceProfile::from_text(&truncated).is_err());
    }

    #[test]
    fn test_from_text_rejects_non_numeric_gain() {
        let text = sample_profile().to_text().replacen("1.25\n", "abc\n", 1);
        let err = DeviceProfile::from_text(&text).unwrap_err();
        assert!(matches!(err, ProfileError::Malformed { line: 7, .. }));
    }

    #[test]
    fn test_from_text_accepts_crlf() {
        let text = sample_profile().to_text().replace('\n', "\r\n");
        let parsed = DeviceProfile::from_text(&text).unwrap();
        assert_eq!(parsed, sample_profile());
    }

    #[test]
    fn test_curve_serde_enforces_invariant() {
        let json = serde_json::to_string(&GainCurve::flat(1.0)).unwrap();
        let parsed: GainCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, GainCurve::flat(1.0));
        assert!(serde_json::from_str::<GainCurve>("[1.0, 2.0]").is_err());
    }

    proptest! {
        #[test]
        fn prop_text_roundtrip_is_exact(
            values in prop::collection::vec(0.0f64..1.0e6, BIN_COUNT),
            rate in 1.0f64..8000.0,
            cpi in 1.0f64..30000.0,
            ppi in 1.0f64..600.0,
        ) {
            let profile = DeviceProfile {
                device_id: "dev".to_string(),
                polling_rate_hz: rate,
                cpi,
                ppi,
                curve: GainCurve::from_values(values).unwrap(),
            };
            let parsed = DeviceProfile::from_text(&profile.to_text()).unwrap();
            prop_assert_eq!(parsed, profile);
        }
    }
}

//! Clock and timing utilities.
//!
//! Motion samples carry monotonic microsecond timestamps supplied by the
//! host. This module provides:
//! - Timestamp stamps used to name persisted profile snapshots
//! - Polling-rate measurement driven by external ticks

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};

/// `chrono` format of snapshot stamps.
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Standard USB report periods in milliseconds.
const STANDARD_PERIODS_MS: [f64; 4] = [1.0, 2.0, 4.0, 8.0];

/// Maximum distance (ms) between a measured and a standard period for snapping.
const PERIOD_SNAP_TOLERANCE_MS: f64 = 0.6;

/// Convert a microsecond interval to seconds.
pub fn us_to_secs(us: u64) -> f64 {
    us as f64 / 1_000_000.0
}

/// Snapshot stamp in `yyyyMMdd_HHmmss` form.
///
/// Lexicographic order of stamps matches chronological order, which the
/// profile store relies on for newest-wins loading.
pub fn snapshot_stamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(STAMP_FORMAT).to_string()
}

/// The stamp one second after `stamp`, or `None` if `stamp` is not a
/// snapshot stamp.
pub fn stamp_after(stamp: &str) -> Option<String> {
    let time = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    let next = time.checked_add_signed(Duration::seconds(1))?;
    Some(next.format(STAMP_FORMAT).to_string())
}

/// Snap a measured rate to the nearest standard USB polling rate.
///
/// Rates whose period lies within 0.6 ms of 1, 2, 4 or 8 ms are reported as
/// exactly 1000, 500, 250 or 125 Hz; anything else is returned unchanged.
pub fn snap_polling_rate(hz: f64) -> f64 {
    if !(hz.is_finite() && hz > 0.0) {
        return hz;
    }
    let period_ms = 1_000.0 / hz;
    STANDARD_PERIODS_MS
        .iter()
        .find(|std| (period_ms - **std).abs() < PERIOD_SNAP_TOLERANCE_MS)
        .map(|std| 1_000.0 / std)
        .unwrap_or(hz)
}

/// Counts device reports between externally supplied ticks.
#[derive(Debug, Clone)]
pub struct PollingRateMeter {
    min_period_us: u64,
    last_tick_us: Option<u64>,
    samples: u64,
}

impl PollingRateMeter {
    /// Create a meter that reports at most once per `min_period_us`.
    pub fn new(min_period_us: u64) -> Self {
        Self {
            min_period_us: min_period_us.max(1),
            last_tick_us: None,
            samples: 0,
        }
    }

    /// Meter with a one second measurement period.
    pub fn per_second() -> Self {
        Self::new(1_000_000)
    }

    /// Record one device report.
    pub fn record_sample(&mut self) {
        self.samples += 1;
    }

    /// Reports counted since the last completed measurement.
    pub fn pending_samples(&self) -> u64 {
        self.samples
    }

    /// Advance the meter to `now_us`.
    ///
    /// The first call only anchors the measurement period. Later calls return
    /// the snapped rate once at least one period has elapsed and reports were
    /// counted, then start a new period.
    pub fn tick(&mut self, now_us: u64) -> Option<f64> {
        match self.last_tick_us {
            None => {
                self.last_tick_us = Some(now_us);
                self.samples = 0;
                None
            }
            Some(last) if now_us >= last + self.min_period_us => {
                let elapsed = us_to_secs(now_us - last);
                let samples = std::mem::take(&mut self.samples);
                self.last_tick_us = Some(now_us);
                (samples > 0).then(|| snap_polling_rate(samples as f64 / elapsed))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    #[test]
    fn test_us_to_secs() {
        assert!((us_to_secs(2_000_000) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_stamp_format() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(snapshot_stamp(&time), "20240309_070501");
    }

    #[test]
    fn test_snapshot_stamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(snapshot_stamp(&earlier) < snapshot_stamp(&later));
    }

    #[test]
    fn test_stamp_after() {
        assert_eq!(stamp_after("20240309_070501").as_deref(), Some("20240309_070502"));
        assert_eq!(stamp_after("29991231_235959").as_deref(), Some("30000101_000000"));
        assert_eq!(stamp_after("notes"), None);
    }

    #[test]
    fn test_snap_polling_rate() {
        assert_eq!(snap_polling_rate(990.0), 1_000.0);
        assert_eq!(snap_polling_rate(123.0), 125.0);
        assert_eq!(snap_polling_rate(505.0), 500.0);
        // 333 Hz is 3 ms, not near a standard period.
        assert!((snap_polling_rate(333.0) - 333.0).abs() < 1e-9);
    }

    #[test]
    fn test_polling_rate_meter() {
        let mut meter = PollingRateMeter::per_second();
        assert_eq!(meter.tick(0), None); // first tick anchors
        for _ in 0..498 {
            meter.record_sample();
        }
        assert_eq!(meter.tick(500_000), None); // too soon
        assert_eq!(meter.pending_samples(), 498);
        assert_eq!(meter.tick(1_000_000), Some(500.0));
        assert_eq!(meter.pending_samples(), 0);
        // A silent period yields no measurement.
        assert_eq!(meter.tick(2_000_000), None);
    }

    proptest! {
        #[test]
        fn prop_snapped_rate_is_standard_or_unchanged(hz in 1.0f64..5_000.0) {
            let snapped = snap_polling_rate(hz);
            let standard = [1_000.0, 500.0, 250.0, 125.0];
            prop_assert!(snapped == hz || standard.contains(&snapped));
        }
    }
}

//! Time-bounded buffer of recent motion samples.

use std::collections::VecDeque;

use autogain_profile_model::{MotionSample, TimestampUs};

/// Highest report rate the buffer is sized for.
const MAX_EXPECTED_RATE_HZ: f64 = 1_000.0;

/// Samples of one device covering at most the configured duration.
///
/// Timestamps are strictly increasing. Pushing a sample evicts everything
/// older than the window measured back from the newest sample.
#[derive(Debug, Clone)]
pub struct EventWindow {
    samples: VecDeque<MotionSample>,
    duration_us: u64,
}

impl EventWindow {
    pub fn new(duration_us: u64) -> Self {
        let capacity = (duration_us as f64 / 1_000_000.0 * MAX_EXPECTED_RATE_HZ) as usize;
        Self {
            samples: VecDeque::with_capacity(capacity.min(1 << 16)),
            duration_us,
        }
    }

    pub fn duration_us(&self) -> u64 {
        self.duration_us
    }

    /// Append a sample.
    ///
    /// Returns `false` and leaves the window untouched when the timestamp is
    /// not strictly greater than the newest buffered one.
    pub fn push(&mut self, sample: MotionSample) -> bool {
        if self
            .newest_timestamp()
            .is_some_and(|newest| sample.timestamp_us <= newest)
        {
            return false;
        }
        let horizon = sample.timestamp_us.saturating_sub(self.duration_us);
        self.samples.push_back(sample);
        while self
            .samples
            .front()
            .is_some_and(|oldest| oldest.timestamp_us < horizon)
        {
            self.samples.pop_front();
        }
        true
    }

    /// Take every buffered sample, oldest first, leaving the window empty.
    pub fn drain(&mut self) -> Vec<MotionSample> {
        self.samples.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn newest_timestamp(&self) -> Option<TimestampUs> {
        self.samples.back().map(|s| s.timestamp_us)
    }

    pub fn oldest_timestamp(&self) -> Option<TimestampUs> {
        self.samples.front().map(|s| s.timestamp_us)
    }

    /// Whether the device has been silent longer than the window at `now_us`.
    pub fn is_idle(&self, now_us: TimestampUs) -> bool {
        self.newest_timestamp()
            .is_some_and(|newest| now_us.saturating_sub(newest) > self.duration_us)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MotionSample> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: u64) -> MotionSample {
        MotionSample::motion("dev", t, 1, 0, 8.0)
    }

    #[test]
    fn test_evicts_beyond_duration() {
        let mut window = EventWindow::new(100_000);
        for t in (0..=300_000).step_by(50_000) {
            assert!(window.push(sample(t)));
        }
        assert_eq!(window.oldest_timestamp(), Some(200_000));
        assert_eq!(window.newest_timestamp(), Some(300_000));
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_rejects_non_increasing_timestamps() {
        let mut window = EventWindow::new(1_000_000);
        assert!(window.push(sample(10)));
        assert!(!window.push(sample(10)));
        assert!(!window.push(sample(5)));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_drain_empties_in_order() {
        let mut window = EventWindow::new(1_000_000);
        window.push(sample(1));
        window.push(sample(2));
        let drained = window.drain();
        assert_eq!(drained.iter().map(|s| s.timestamp_us).collect::<Vec<_>>(), vec![1, 2]);
        assert!(window.is_empty());
        assert_eq!(window.newest_timestamp(), None);
    }

    #[test]
    fn test_idle_detection() {
        let mut window = EventWindow::new(5_000_000);
        assert!(!window.is_idle(100_000_000));
        window.push(sample(1_000_000));
        assert!(!window.is_idle(6_000_000));
        assert!(window.is_idle(6_000_001));
    }
}

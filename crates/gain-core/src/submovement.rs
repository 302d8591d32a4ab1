//! Submovement segmentation and classification.
//!
//! Surviving speed minima delimit submovements; surviving maxima mark their
//! peaks. Each submovement is scored against the target (the display
//! position at click time) and classified as clutching, unaimed, interrupted
//! and ballistic or fine-correction.
//!
//! # Algorithm
//!
//! 1. Drop maxima that open before the first minimum and close the series
//!    with a terminal minimum at the last bucket.
//! 2. The **dominant** submovement holds the fastest maximum; earlier
//!    submovements are pre-movement noise and are never scored.
//! 3. A max-to-max span containing a bucket longer than the clutch
//!    threshold flags its opening maximum; the flag moves to the first
//!    submovement containing that maximum.
//! 4. Geometry per submovement: `d1` start to end, `d2` start to target,
//!    and the angle at the start between the path and the target direction.
//! 5. The first `max_submovements` non-clutching submovements from the
//!    dominant one onward are ballistic.

use autogain_common::config::LearningConfig;

use crate::extrema::Extrema;
use crate::kinematics::Kinematics;

/// Classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierParams {
    /// Largest aimed angle in radians.
    pub max_angle_rad: f64,
    pub max_overshoot_ratio: f64,
    pub interrupted_ratio: f64,
    pub clutch_threshold_ms: f64,
    pub max_submovements: usize,
}

impl From<&LearningConfig> for ClassifierParams {
    fn from(config: &LearningConfig) -> Self {
        Self {
            max_angle_rad: config.max_angle_deg.to_radians(),
            max_overshoot_ratio: config.max_overshoot_ratio,
            interrupted_ratio: config.interrupted_ratio,
            clutch_threshold_ms: config.clutch_threshold_ms,
            max_submovements: config.max_submovements,
        }
    }
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self::from(&LearningConfig::default())
    }
}

/// Distances and angles of one submovement relative to the target.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AimGeometry {
    /// Start to end distance (m).
    pub d1: f64,
    /// Start to target distance (m).
    pub d2: f64,
    /// Angle at the start between end and target directions (rad).
    pub angle: f64,
    /// Largest such angle over the submovement's samples (rad).
    pub max_angle: f64,
}

type Point = (f64, f64);

fn distance(a: Point, b: Point) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

/// Angle at `start` in the triangle `start`, `point`, `target`.
fn angle_at(start: Point, point: Point, target: Point) -> f64 {
    let d1 = distance(start, point);
    let d2 = distance(start, target);
    if d1 == 0.0 || d2 == 0.0 {
        return 0.0;
    }
    let d3 = distance(point, target);
    let cos = (d1 * d1 + d2 * d2 - d3 * d3) / (2.0 * d1 * d2);
    cos.clamp(-1.0, 1.0).acos()
}

impl AimGeometry {
    /// Geometry of a path that begins at `start`, visits `path` in order
    /// (its last point is the end), aiming for `target`.
    pub fn from_path(start: Point, path: impl IntoIterator<Item = Point>, target: Point) -> Self {
        let mut end = start;
        let mut angle = 0.0;
        let mut max_angle: f64 = 0.0;
        for point in path {
            angle = angle_at(start, point, target);
            max_angle = max_angle.max(angle);
            end = point;
        }
        Self {
            d1: distance(start, end),
            d2: distance(start, target),
            angle,
            max_angle,
        }
    }

    /// Geometry of buckets `start..=end` of `k`.
    pub fn measure(k: &Kinematics, start: usize, end: usize, target: Point) -> Self {
        Self::from_path(
            k.position(start),
            (start + 1..=end).map(|i| k.position(i)),
            target,
        )
    }

    /// `d1 / (d2 cos angle)`, undefined for degenerate or backward movements.
    pub fn overshoot_ratio(&self) -> Option<f64> {
        let projected = self.d2 * self.angle.cos();
        if self.d1 == 0.0 || self.d2 == 0.0 || projected <= 0.0 {
            return None;
        }
        Some(self.d1 / projected)
    }

    pub fn is_unaimed(&self, max_angle_rad: f64, max_overshoot_ratio: f64) -> bool {
        let aimed = self.max_angle <= max_angle_rad
            && self
                .overshoot_ratio()
                .is_some_and(|ratio| ratio <= max_overshoot_ratio);
        !aimed
    }

    pub fn is_interrupted(&self, interrupted_ratio: f64) -> bool {
        self.overshoot_ratio()
            .is_some_and(|ratio| ratio < interrupted_ratio)
    }

    /// Distance still to go along the target direction after `ratio` of it.
    pub fn longitudinal_error(&self, ratio: f64) -> f64 {
        ratio * self.d2 * self.angle.cos() - self.d1
    }
}

/// One classified submovement between two speed minima.
#[derive(Debug, Clone, PartialEq)]
pub struct Submovement {
    /// First bucket (a speed minimum).
    pub start: usize,
    /// Last bucket (the next speed minimum).
    pub end: usize,
    pub geometry: AimGeometry,
    pub clutching: bool,
    pub unaimed: bool,
    pub interrupted: bool,
    pub ballistic: bool,
}

/// Classified submovements of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub submovements: Vec<Submovement>,
    /// Index of the submovement holding the fastest maximum.
    pub dominant: usize,
}

impl Segmentation {
    /// Submovements from the dominant one onward.
    pub fn scored(&self) -> &[Submovement] {
        &self.submovements[self.dominant..]
    }

    /// Number of aimed submovements from the dominant one onward.
    pub fn aimed_count(&self) -> usize {
        self.scored().iter().filter(|s| !s.unaimed).count()
    }
}

/// Segment `k` at the surviving `extrema` of its speed series and classify
/// every submovement.
///
/// Returns `None` when no submovement or no peak survives.
pub fn classify(extrema: &Extrema, k: &Kinematics, params: &ClassifierParams) -> Option<Segmentation> {
    let target = k.target()?;
    let last = k.len() - 1;

    let mut minima: Vec<usize> = extrema.minima.iter().copied().filter(|&i| i <= last).collect();
    let first_min = *minima.first()?;
    let maxima: Vec<usize> = extrema
        .maxima
        .iter()
        .copied()
        .filter(|&i| i > first_min && i <= last)
        .collect();
    if minima.last() != Some(&last) {
        minima.push(last);
    }
    if minima.len() < 2 || maxima.is_empty() {
        return None;
    }

    let flagged: Vec<bool> = (0..maxima.len())
        .map(|m| {
            maxima.get(m + 1).is_some_and(|&next| {
                k.timespan_ms[maxima[m]..=next]
                    .iter()
                    .any(|span| *span > params.clutch_threshold_ms)
            })
        })
        .collect();

    let fastest = maxima
        .iter()
        .copied()
        .fold(None, |best: Option<usize>, i| match best {
            Some(b) if k.speed[b] >= k.speed[i] => Some(b),
            _ => Some(i),
        })?;

    let mut consumed = vec![false; maxima.len()];
    let mut dominant = 0;
    let mut submovements = Vec::with_capacity(minima.len() - 1);
    for (s, pair) in minima.windows(2).enumerate() {
        let (start, end) = (pair[0], pair[1]);

        let mut clutching = false;
        for (m, &peak) in maxima.iter().enumerate() {
            if consumed[m] || peak < start || peak > end {
                continue;
            }
            consumed[m] = true;
            clutching |= flagged[m];
            if peak == fastest {
                dominant = s;
            }
        }

        let geometry = AimGeometry::measure(k, start, end, target);
        submovements.push(Submovement {
            start,
            end,
            geometry,
            clutching,
            unaimed: geometry.is_unaimed(params.max_angle_rad, params.max_overshoot_ratio),
            interrupted: geometry.is_interrupted(params.interrupted_ratio),
            ballistic: false,
        });
    }

    submovements[dominant..]
        .iter_mut()
        .filter(|s| !s.clutching)
        .take(params.max_submovements)
        .for_each(|s| s.ballistic = true);

    Some(Segmentation {
        submovements,
        dominant,
    })
}

//! FIR smoothing and finite differences shared by kinematics and learning.

/// Outer weight of the smoothing kernel.
pub const KERNEL_EDGE: f64 = 0.27901;

/// Centre weight of the smoothing kernel.
pub const KERNEL_CENTER: f64 = 0.44198;

/// Symmetric 7-tap smoothing kernel.
pub const SMOOTHING_KERNEL: [f64; 7] = [0.0, 0.0, KERNEL_EDGE, KERNEL_CENTER, KERNEL_EDGE, 0.0, 0.0];

/// Convolve `series` with [`SMOOTHING_KERNEL`].
///
/// Each output is normalised by the sum of the taps that fall inside the
/// series, so edge positions use a partial, renormalised kernel.
pub fn smooth(series: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; series.len()];
    smooth_into(series, &mut out);
    out
}

/// [`smooth`] writing into a caller-owned buffer of the same length.
pub fn smooth_into(series: &[f64], out: &mut [f64]) {
    debug_assert_eq!(series.len(), out.len());
    let half = SMOOTHING_KERNEL.len() / 2;
    let n = series.len() as isize;

    for (i, slot) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        let mut weight = 0.0;
        for (k, w) in SMOOTHING_KERNEL.iter().enumerate() {
            let j = i as isize + k as isize - half as isize;
            if j < 0 || j >= n {
                continue;
            }
            acc += w * series[j as usize];
            weight += w;
        }
        *slot = if weight > 0.0 { acc / weight } else { 0.0 };
    }
}

/// Central difference of `values` over `times`, zero at both ends.
///
/// Intervals of zero length produce zero rather than infinity.
pub fn central_difference(values: &[f64], times: &[f64]) -> Vec<f64> {
    debug_assert_eq!(values.len(), times.len());
    let n = values.len();
    let mut out = vec![0.0; n];
    for i in 1..n.saturating_sub(1) {
        let dt = times[i + 1] - times[i - 1];
        if dt > 0.0 {
            out[i] = (values[i + 1] - values[i - 1]) / dt;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_sums_to_one() {
        let sum: f64 = SMOOTHING_KERNEL.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_series_is_preserved() {
        let smoothed = smooth(&[3.0; 9]);
        for v in smoothed {
            assert!((v - 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_impulse_spreads_to_neighbours() {
        let mut series = vec![0.0; 7];
        series[3] = 1.0;
        let smoothed = smooth(&series);
        assert!((smoothed[2] - KERNEL_EDGE).abs() < 1e-12);
        assert!((smoothed[3] - KERNEL_CENTER).abs() < 1e-12);
        assert!((smoothed[4] - KERNEL_EDGE).abs() < 1e-12);
        assert_eq!(smoothed[1], 0.0);
        assert_eq!(smoothed[5], 0.0);
    }

    #[test]
    fn test_edges_are_renormalised() {
        let smoothed = smooth(&[1.0, 0.0, 0.0]);
        let expected = KERNEL_CENTER / (KERNEL_CENTER + KERNEL_EDGE);
        assert!((smoothed[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(smooth(&[]), Vec::<f64>::new());
        assert_eq!(smooth(&[5.0]), vec![5.0]);
    }

    #[test]
    fn test_central_difference() {
        let times = [0.0, 1.0, 2.0, 3.0];
        let values = [0.0, 2.0, 4.0, 6.0];
        assert_eq!(central_difference(&values, &times), vec![0.0, 2.0, 2.0, 0.0]);
        assert_eq!(central_difference(&[1.0], &[0.0]), vec![0.0]);
        assert_eq!(
            central_difference(&[0.0, 1.0, 2.0], &[1.0, 1.0, 1.0]),
            vec![0.0, 0.0, 0.0]
        );
    }
}

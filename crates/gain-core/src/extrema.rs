//! Persistence-based extremum detection for 1D signals.
//!
//! # Algorithm
//!
//! 1. **Extract** every local minimum and maximum. Endpoints count, and a
//!    plateau of equal values is represented by its first index. The
//!    resulting list alternates between minima and maxima.
//! 2. **Cancel** the adjacent min/max pair with the smallest value
//!    difference (its persistence) while that difference is below the
//!    threshold. Removing an adjacent pair keeps the list alternating, and
//!    the globally smallest pair is always dominated by its neighbours, so
//!    the stronger features survive. Ties go to the lower index.
//! 3. **Report** the surviving minima and maxima in ascending index order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

/// Surviving extrema of a series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extrema {
    /// Indices of surviving minima, ascending.
    pub minima: Vec<usize>,
    /// Indices of surviving maxima, ascending.
    pub maxima: Vec<usize>,
}

impl Extrema {
    /// Whether enough features survived to delimit submovements.
    pub fn is_usable(&self) -> bool {
        self.minima.len() >= 2 && self.maxima.len() >= 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Min,
    Max,
}

#[derive(Debug, Clone)]
struct Node {
    index: usize,
    value: f64,
    kind: Kind,
    prev: Option<usize>,
    next: Option<usize>,
    alive: bool,
}

/// A cancellable adjacent pair: persistence, then left and right node.
///
/// Wrapped in `Reverse` so the heap pops the smallest persistence first and,
/// among equals, the leftmost pair.
type Candidate = Reverse<(OrderedFloat<f64>, usize, usize)>;

/// Find the extrema of `series` whose persistence reaches `threshold`.
///
/// Returns empty lists for series shorter than two samples or without any
/// variation.
pub fn find_extrema(series: &[f64], threshold: f64) -> Extrema {
    let mut nodes = raw_extrema(series);
    if nodes.is_empty() {
        return Extrema::default();
    }

    let mut heap = BinaryHeap::with_capacity(nodes.len());
    for left in 0..nodes.len() - 1 {
        heap.push(pair(&nodes, left, left + 1));
    }

    while let Some(Reverse((persistence, left, right))) = heap.pop() {
        let adjacent =
            nodes[left].alive && nodes[right].alive && nodes[left].next == Some(right);
        if !adjacent {
            continue;
        }
        if persistence.0 >= threshold {
            break;
        }

        let before = nodes[left].prev;
        let after = nodes[right].next;
        nodes[left].alive = false;
        nodes[right].alive = false;
        if let Some(b) = before {
            nodes[b].next = after;
        }
        if let Some(a) = after {
            nodes[a].prev = before;
        }
        if let (Some(b), Some(a)) = (before, after) {
            heap.push(pair(&nodes, b, a));
        }
    }

    let mut extrema = Extrema::default();
    for node in nodes.iter().filter(|n| n.alive) {
        match node.kind {
            Kind::Min => extrema.minima.push(node.index),
            Kind::Max => extrema.maxima.push(node.index),
        }
    }
    extrema
}

fn pair(nodes: &[Node], left: usize, right: usize) -> Candidate {
    let persistence = (nodes[left].value - nodes[right].value).abs();
    Reverse((OrderedFloat(persistence), left, right))
}

/// All local extrema, alternating, linked in index order.
fn raw_extrema(series: &[f64]) -> Vec<Node> {
    if series.len() < 2 {
        return vec![];
    }

    // Collapse plateaus to their first index.
    let mut runs: Vec<(usize, f64)> = Vec::with_capacity(series.len());
    for (i, &v) in series.iter().enumerate() {
        if runs.last().map_or(true, |&(_, last)| last != v) {
            runs.push((i, v));
        }
    }
    if runs.len() < 2 {
        return vec![];
    }

    let last = runs.len() - 1;
    let mut nodes: Vec<Node> = Vec::new();
    for (r, &(index, value)) in runs.iter().enumerate() {
        let kind = if r == 0 {
            Some(if runs[1].1 > value { Kind::Min } else { Kind::Max })
        } else if r == last {
            Some(if runs[r - 1].1 > value { Kind::Min } else { Kind::Max })
        } else {
            let (prev, next) = (runs[r - 1].1, runs[r + 1].1);
            if value < prev && value < next {
                Some(Kind::Min)
            } else if value > prev && value > next {
                Some(Kind::Max)
            } else {
                None
            }
        };

        if let Some(kind) = kind {
            let position = nodes.len();
            nodes.push(Node {
                index,
                value,
                kind,
                prev: position.checked_sub(1),
                next: None,
                alive: true,
            });
            if position > 0 {
                nodes[position - 1].next = Some(position);
            }
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn merged(extrema: &Extrema) -> Vec<(usize, bool)> {
        let mut all: Vec<(usize, bool)> = extrema
            .minima
            .iter()
            .map(|&i| (i, true))
            .chain(extrema.maxima.iter().map(|&i| (i, false)))
            .collect();
        all.sort_unstable();
        all
    }

    #[test]
    fn test_small_interior_pair_is_cancelled() {
        let series = [0.0, 5.0, 4.9, 5.0, 0.0];
        let extrema = find_extrema(&series, 1.0);
        assert_eq!(extrema.minima, vec![0, 4]);
        assert_eq!(extrema.maxima.len(), 1);
        assert_eq!(series[extrema.maxima[0]], 5.0);
    }

    #[test]
    fn test_equal_persistence_cancels_leftmost_pair() {
        // (1, 2) and (2, 3) both have persistence 0.5; the left pair goes.
        let extrema = find_extrema(&[0.0, 1.0, 0.5, 1.0, 0.0], 0.6);
        assert_eq!(extrema.minima, vec![0, 4]);
        assert_eq!(extrema.maxima, vec![3]);
    }

    #[test]
    fn test_zero_threshold_keeps_everything() {
        let series = [0.0, 5.0, 4.9, 5.0, 0.0];
        let extrema = find_extrema(&series, 0.0);
        assert_eq!(extrema.minima, vec![0, 2, 4]);
        assert_eq!(extrema.maxima, vec![1, 3]);
    }

    #[test]
    fn test_two_peaks_survive_noise() {
        let series = [
            0.0, 0.3, 0.6, 0.58, 0.61, 0.3, 0.05, 0.06, 0.04, 0.2, 0.4, 0.39, 0.2, 0.0,
        ];
        let extrema = find_extrema(&series, 0.1);
        assert!(extrema.is_usable());
        assert_eq!(extrema.maxima.len(), 2);
        assert_eq!(extrema.minima.len(), 3);
        assert_eq!(extrema.minima[0], 0);
        assert_eq!(*extrema.minima.last().unwrap(), 13);
        assert_eq!(extrema.maxima[0], 4);
        assert_eq!(extrema.maxima[1], 10);
    }

    #[test]
    fn test_plateau_uses_first_index() {
        let series = [0.0, 1.0, 1.0, 1.0, 0.0];
        let extrema = find_extrema(&series, 0.0);
        assert_eq!(extrema.maxima, vec![1]);
        assert_eq!(extrema.minima, vec![0, 4]);
    }

    #[test]
    fn test_degenerate_series() {
        assert_eq!(find_extrema(&[], 0.0), Extrema::default());
        assert_eq!(find_extrema(&[1.0], 0.0), Extrema::default());
        assert_eq!(find_extrema(&[2.0, 2.0, 2.0], 0.0), Extrema::default());
        assert!(!find_extrema(&[0.0, 1.0], 0.0).is_usable());
    }

    #[test]
    fn test_everything_cancels_under_large_threshold() {
        let extrema = find_extrema(&[0.0, 1.0, 0.0], 10.0);
        assert!(extrema.minima.len() + extrema.maxima.len() <= 1);
    }

    proptest! {
        #[test]
        fn prop_survivors_alternate_and_are_persistent(
            series in prop::collection::vec(0.0f64..1.0, 2..200),
            threshold in 0.0f64..0.5,
        ) {
            let extrema = find_extrema(&series, threshold);
            let all = merged(&extrema);
            for window in all.windows(2) {
                let (a, a_min) = window[0];
                let (b, b_min) = window[1];
                prop_assert_ne!(a_min, b_min);
                prop_assert!((series[a] - series[b]).abs() >= threshold);
            }
        }
    }
}

//! Piecewise-linear table lookup.

/// Linearly interpolate `table` at a fractional `index`.
///
/// Indices below zero return the first entry; indices whose ceiling falls
/// outside the table return the last entry. An empty table yields `0.0`.
pub fn interpolate(index: f64, table: &[f64]) -> f64 {
    let Some(&last) = table.last() else {
        return 0.0;
    };
    if index < 0.0 {
        return table[0];
    }
    let upper = index.ceil();
    if upper >= table.len() as f64 {
        return last;
    }

    // NaN falls through to here and casts to 0.
    let hi = upper as usize;
    let lo = index.floor() as usize;
    if lo == hi {
        return (table[lo] + table[hi]) * 0.5;
    }
    table[lo] + (table[hi] - table[lo]) * (index - lo as f64)
}

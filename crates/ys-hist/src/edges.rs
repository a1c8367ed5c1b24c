//! Bin-edge generation and validation.

use ys_core::{Error, Result};

/// Default relative tolerance when merging near-equal edges derived from
/// reference data.
pub const DEFAULT_EDGE_TOLERANCE: f64 = 1e-5;

/// Check that `edges` describe at least one bin and are finite and strictly
/// increasing.
pub fn validate(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::InvalidAxis(format!(
            "need at least 2 edges, got {}",
            edges.len()
        )));
    }
    if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
        return Err(Error::InvalidAxis(format!("non-finite edge: {bad}")));
    }
    for (i, w) in edges.windows(2).enumerate() {
        if w[0] >= w[1] {
            return Err(Error::InvalidAxis(format!(
                "edges not strictly increasing at index {}: {} >= {}",
                i + 1,
                w[0],
                w[1]
            )));
        }
    }
    Ok(())
}

/// `n_bins + 1` uniformly spaced edges spanning `[lower, upper]`.
pub fn linspace(n_bins: usize, lower: f64, upper: f64) -> Result<Vec<f64>> {
    if n_bins == 0 {
        return Err(Error::InvalidAxis("number of bins must be at least 1".into()));
    }
    if !(lower.is_finite() && upper.is_finite()) || lower >= upper {
        return Err(Error::InvalidAxis(format!("invalid range [{lower}, {upper}]")));
    }
    let step = (upper - lower) / n_bins as f64;
    let mut edges: Vec<f64> = (0..n_bins).map(|i| lower + step * i as f64).collect();
    // Pin the last edge so accumulated rounding cannot shift the range.
    edges.push(upper);
    validate(&edges)?;
    Ok(edges)
}

/// `n_bins + 1` logarithmically spaced edges spanning `[lower, upper]`.
///
/// Requires `0 < lower < upper`.
pub fn logspace(n_bins: usize, lower: f64, upper: f64) -> Result<Vec<f64>> {
    if lower <= 0.0 {
        return Err(Error::InvalidAxis(format!(
            "logarithmic binning needs a positive lower edge, got {lower}"
        )));
    }
    let log_edges = linspace(n_bins, lower.ln(), upper.ln())?;
    let mut edges: Vec<f64> = log_edges.into_iter().map(f64::exp).collect();
    edges[0] = lower;
    edges[n_bins] = upper;
    validate(&edges)?;
    Ok(edges)
}

/// Relative comparison with an absolute floor near zero.
pub fn fuzzy_equals(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs());
    if scale < tolerance {
        return true;
    }
    (a - b).abs() <= tolerance * scale
}

/// Derive contiguous bin edges from `(low, high)` ranges, as given by
/// reference-data points with x errors.
///
/// All range ends are sorted and runs of values that are fuzzy-equal (within
/// `tolerance`) to the first value of the run collapse onto that first, lowest
/// value. Gaps between ranges become bins of their own.
pub fn edges_from_ranges<I>(ranges: I, tolerance: f64) -> Result<Vec<f64>>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut raw = Vec::new();
    for (low, high) in ranges {
        if !(low.is_finite() && high.is_finite()) || low >= high {
            return Err(Error::InvalidAxis(format!("degenerate range [{low}, {high}]")));
        }
        raw.push(low);
        raw.push(high);
    }
    raw.sort_by(f64::total_cmp);

    let mut edges: Vec<f64> = Vec::with_capacity(raw.len());
    let mut run_start = f64::NAN;
    for v in raw {
        if !run_start.is_nan() && fuzzy_equals(v, run_start, tolerance) {
            continue;
        }
        run_start = v;
        edges.push(v);
    }
    validate(&edges)?;
    Ok(edges)
}

/// Locate `x` in sorted `edges` using half-open `[low, high)` bins.
///
/// Returns `None` if `x` lies below the first or at/above the last edge.
pub(crate) fn find_bin(edges: &[f64], x: f64) -> Option<usize> {
    let n = edges.len();
    if n < 2 || !(x >= edges[0] && x < edges[n - 1]) {
        return None;
    }
    // Number of edges <= x; at least 1 and at most n - 1 here.
    Some(edges.partition_point(|&e| e <= x) - 1)
}

//! Bins: a fixed coordinate range plus a weighted-moment accumulator.
//!
//! [`Bin1D`] is generic over its accumulator. Histogram bins hold a
//! [`Dbn1D`] ([`HistoBin1D`]); profile bins hold a [`Dbn2D`]
//! ([`ProfileBin1D`]) so the mean of the dependent variable can be reported
//! per bin. Edges are part of a bin's identity: arithmetic between bins is
//! only defined when the edges are identical.

use serde::{Deserialize, Serialize};
use ys_core::{Dbn1D, Dbn2D, Distribution, Error, Result};

/// Histogram bin.
pub type HistoBin1D = Bin1D<Dbn1D>;

/// Profile bin.
pub type ProfileBin1D = Bin1D<Dbn2D>;

/// A half-open interval `[x_low, x_high)` with an accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin1D<D> {
    x_low: f64,
    x_high: f64,
    dbn: D,
}

fn check_interval(low: f64, high: f64) -> Result<()> {
    if low.is_finite() && high.is_finite() && low < high {
        Ok(())
    } else {
        Err(Error::InvalidAxis(format!("invalid bin interval [{low}, {high})")))
    }
}

impl<D: Distribution> Bin1D<D> {
    /// Empty bin covering `[low, high)`.
    pub fn new(low: f64, high: f64) -> Result<Self> {
        Self::with_dbn(low, high, D::default())
    }

    /// Bin with pre-accumulated content.
    pub fn with_dbn(low: f64, high: f64, dbn: D) -> Result<Self> {
        check_interval(low, high)?;
        Ok(Self { x_low: low, x_high: high, dbn })
    }

    /// Lower edge (inclusive).
    pub fn x_low(&self) -> f64 {
        self.x_low
    }

    /// Upper edge (exclusive).
    pub fn x_high(&self) -> f64 {
        self.x_high
    }

    /// Geometric centre.
    pub fn x_mid(&self) -> f64 {
        0.5 * (self.x_low + self.x_high)
    }

    /// `x_high - x_low`.
    pub fn width(&self) -> f64 {
        self.x_high - self.x_low
    }

    /// True if `x` lies in `[x_low, x_high)`.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.x_low && x < self.x_high
    }

    /// The accumulator.
    pub fn dbn(&self) -> &D {
        &self.dbn
    }

    /// Number of fills.
    pub fn num_entries(&self) -> u64 {
        self.dbn.num_entries()
    }

    /// Effective number of fills.
    pub fn eff_num_entries(&self) -> f64 {
        self.dbn.eff_num_entries()
    }

    /// `Σw`.
    pub fn sum_w(&self) -> f64 {
        self.dbn.sum_w()
    }

    /// `Σw²`.
    pub fn sum_w2(&self) -> f64 {
        self.dbn.sum_w2()
    }

    /// Rescale weights.
    pub fn scale_w(&mut self, factor: f64) {
        self.dbn.scale_w(factor);
    }

    /// Clear the content, keeping the edges.
    pub fn reset(&mut self) {
        self.dbn.reset();
    }

    /// True if both bins have identical edges.
    pub fn same_edges(&self, other: &Self) -> bool {
        self.x_low == other.x_low && self.x_high == other.x_high
    }

    fn check_edges(&self, other: &Self) -> Result<()> {
        if self.same_edges(other) {
            Ok(())
        } else {
            Err(Error::EdgeMismatch(format!(
                "[{}, {}) vs [{}, {})",
                self.x_low, self.x_high, other.x_low, other.x_high
            )))
        }
    }

    /// Add `other`'s content into this bin. Fails if edges differ.
    pub fn try_add_assign(&mut self, other: &Self) -> Result<()> {
        self.check_edges(other)?;
        self.dbn += other.dbn.clone();
        Ok(())
    }

    /// Subtract `other`'s content from this bin. Fails if edges differ.
    pub fn try_sub_assign(&mut self, other: &Self) -> Result<()> {
        self.check_edges(other)?;
        self.dbn -= other.dbn.clone();
        Ok(())
    }

    /// New bin with the summed content of `self` and `other`.
    pub fn try_add(&self, other: &Self) -> Result<Self> {
        let mut out = self.clone();
        out.try_add_assign(other)?;
        Ok(out)
    }

    /// New bin with `other`'s content subtracted from `self`'s.
    pub fn try_sub(&self, other: &Self) -> Result<Self> {
        let mut out = self.clone();
        out.try_sub_assign(other)?;
        Ok(out)
    }

    /// Merge with the bin immediately to the right into one wider bin.
    pub fn merge_adjacent(&self, right: &Self) -> Result<Self> {
        if self.x_high != right.x_low {
            return Err(Error::EdgeMismatch(format!(
                "bins [{}, {}) and [{}, {}) are not adjacent",
                self.x_low, self.x_high, right.x_low, right.x_high
            )));
        }
        let mut dbn = self.dbn.clone();
        dbn += right.dbn.clone();
        Ok(Self { x_low: self.x_low, x_high: right.x_high, dbn })
    }

    fn check_contains(&self, x: f64) -> Result<()> {
        if self.contains(x) || x.is_nan() {
            // NaN is reported by the accumulator as invalid input.
            Ok(())
        } else {
            Err(Error::OutOfRange { x, low: self.x_low, high: self.x_high })
        }
    }
}

impl Bin1D<Dbn1D> {
    /// Record `(x, weight)`; `x` must lie inside the bin.
    pub fn fill(&mut self, x: f64, weight: f64) -> Result<()> {
        self.check_contains(x)?;
        self.dbn.fill(x, weight)
    }

    /// Weighted mean x position if the bin has weight, else the midpoint.
    pub fn focus(&self) -> f64 {
        if self.dbn.sum_w() != 0.0 { self.dbn.mean() } else { self.x_mid() }
    }

    /// Weighted mean of x within the bin.
    pub fn x_mean(&self) -> f64 {
        self.dbn.mean()
    }

    /// `Σw`, the bin integral.
    pub fn area(&self) -> f64 {
        self.dbn.sum_w()
    }

    /// `sqrt(Σw²)`.
    pub fn area_err(&self) -> f64 {
        self.dbn.sum_w2().sqrt()
    }

    /// Density: `Σw / width`.
    pub fn height(&self) -> f64 {
        self.area() / self.width()
    }

    /// `sqrt(Σw²) / width`.
    pub fn height_err(&self) -> f64 {
        self.area_err() / self.width()
    }

    /// Relative error on the content; `0` for an empty bin.
    pub fn rel_err(&self) -> f64 {
        let a = self.area();
        if a == 0.0 { 0.0 } else { self.area_err() / a.abs() }
    }
}

impl Bin1D<Dbn2D> {
    /// Record `(x, y, weight)`; `x` must lie inside the bin.
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) -> Result<()> {
        self.check_contains(x)?;
        self.dbn.fill(x, y, weight)
    }

    /// Weighted mean x position if the bin has weight, else the midpoint.
    pub fn focus(&self) -> f64 {
        if self.dbn.sum_w() != 0.0 { self.dbn.mean_x() } else { self.x_mid() }
    }

    /// Weighted mean of y.
    pub fn mean(&self) -> f64 {
        self.dbn.mean_y()
    }

    /// Weighted variance of y.
    pub fn variance(&self) -> f64 {
        self.dbn.y().variance()
    }

    /// Weighted standard deviation of y.
    pub fn std_dev(&self) -> f64 {
        self.dbn.y().std_dev()
    }

    /// Standard error on the mean of y.
    pub fn std_err(&self) -> f64 {
        self.dbn.y().std_err()
    }

    /// Root-mean-square of y.
    pub fn rms(&self) -> f64 {
        self.dbn.y().rms()
    }

    /// `Σwy`.
    pub fn sum_wy(&self) -> f64 {
        self.dbn.sum_wy()
    }

    /// `Σwy²`.
    pub fn sum_wy2(&self) -> f64 {
        self.dbn.sum_wy2()
    }
}

/// A rectangular 2D histogram bin `[x_low, x_high) × [y_low, y_high)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoBin2D {
    x_low: f64,
    x_high: f64,
    y_low: f64,
    y_high: f64,
    dbn: Dbn2D,
}

impl HistoBin2D {
    /// Empty bin.
    pub fn new(x_low: f64, x_high: f64, y_low: f64, y_high: f64) -> Result<Self> {
        check_interval(x_low, x_high)?;
        check_interval(y_low, y_high)?;
        Ok(Self { x_low, x_high, y_low, y_high, dbn: Dbn2D::default() })
    }

    /// `(x_low, x_high)`.
    pub fn x_edges(&self) -> (f64, f64) {
        (self.x_low, self.x_high)
    }

    /// `(y_low, y_high)`.
    pub fn y_edges(&self) -> (f64, f64) {
        (self.y_low, self.y_high)
    }

    /// The accumulator.
    pub fn dbn(&self) -> &Dbn2D {
        &self.dbn
    }

    /// True if `(x, y)` lies in the bin.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_low && x < self.x_high && y >= self.y_low && y < self.y_high
    }

    /// Record `(x, y, weight)`; the point must lie inside the bin.
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) -> Result<()> {
        if !(self.contains(x, y) || x.is_nan() || y.is_nan()) {
            let (x, low, high) = if x >= self.x_low && x < self.x_high {
                (y, self.y_low, self.y_high)
            } else {
                (x, self.x_low, self.x_high)
            };
            return Err(Error::OutOfRange { x, low, high });
        }
        self.dbn.fill(x, y, weight)
    }

    /// Bin area in the (x, y) plane.
    pub fn area(&self) -> f64 {
        (self.x_high - self.x_low) * (self.y_high - self.y_low)
    }

    /// `Σw`.
    pub fn volume(&self) -> f64 {
        self.dbn.sum_w()
    }

    /// `sqrt(Σw²)`.
    pub fn volume_err(&self) -> f64 {
        self.dbn.sum_w2().sqrt()
    }

    /// Density: `Σw / area`.
    pub fn height(&self) -> f64 {
        self.volume() / self.area()
    }

    /// `sqrt(Σw²) / area`.
    pub fn height_err(&self) -> f64 {
        self.volume_err() / self.area()
    }

    /// Weighted mean position if the bin has weight, else the centre.
    pub fn focus(&self) -> (f64, f64) {
        if self.dbn.sum_w() != 0.0 {
            (self.dbn.mean_x(), self.dbn.mean_y())
        } else {
            (0.5 * (self.x_low + self.x_high), 0.5 * (self.y_low + self.y_high))
        }
    }

    /// Rescale weights.
    pub fn scale_w(&mut self, factor: f64) {
        self.dbn.scale_w(factor);
    }

    /// Add `other`'s content. Fails if any edge differs.
    pub fn try_add_assign(&mut self, other: &Self) -> Result<()> {
        if self.x_edges() != other.x_edges() || self.y_edges() != other.y_edges() {
            return Err(Error::EdgeMismatch(format!(
                "2D bins {:?}x{:?} vs {:?}x{:?}",
                self.x_edges(),
                self.y_edges(),
                other.x_edges(),
                other.y_edges()
            )));
        }
        self.dbn += other.dbn;
        Ok(())
    }
}

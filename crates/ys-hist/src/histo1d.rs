//! One-dimensional weighted histogram.

use serde::{Deserialize, Serialize};
use ys_core::{Dbn1D, Distribution, Error, Result, ResultExt};

use crate::annotations::{self, Annotations};
use crate::axis::{Axis1D, BinIndex};
use crate::bin::HistoBin1D;
use crate::edges;

/// A path-addressed histogram over an [`Axis1D`] of [`HistoBin1D`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histo1D {
    annotations: Annotations,
    axis: Axis1D<Dbn1D>,
}

impl Histo1D {
    /// Histogram at `path` over an existing axis.
    pub fn new(path: impl Into<String>, axis: Axis1D<Dbn1D>) -> Self {
        Self { annotations: Annotations::with_path(path, ""), axis }
    }

    /// Histogram with explicit bin edges.
    pub fn with_edges(path: impl Into<String>, edges: &[f64]) -> Result<Self> {
        let path = path.into();
        let axis = Axis1D::from_edges(edges).in_object(&path, "book")?;
        Ok(Self::new(path, axis))
    }

    /// Histogram with `n_bins` equal-width bins over `[lower, upper)`.
    pub fn uniform(path: impl Into<String>, n_bins: usize, lower: f64, upper: f64) -> Result<Self> {
        let path = path.into();
        let axis = Axis1D::uniform(n_bins, lower, upper).in_object(&path, "book")?;
        Ok(Self::new(path, axis))
    }

    /// Histogram with `n_bins` log-spaced bins over `[lower, upper)`.
    pub fn log(path: impl Into<String>, n_bins: usize, lower: f64, upper: f64) -> Result<Self> {
        let path = path.into();
        let axis = Axis1D::log(n_bins, lower, upper).in_object(&path, "book")?;
        Ok(Self::new(path, axis))
    }

    /// Builder-style title setter.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.set_title(title);
        self
    }

    /// Object path.
    pub fn path(&self) -> &str {
        self.annotations.get(annotations::PATH).unwrap_or_default()
    }

    /// Object title.
    pub fn title(&self) -> &str {
        self.annotations.get(annotations::TITLE).unwrap_or_default()
    }

    /// Change the path.
    pub(crate) fn set_path(&mut self, path: impl Into<String>) {
        self.annotations.insert(annotations::PATH, path);
    }

    /// Change the title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.annotations.insert(annotations::TITLE, title);
    }

    /// Annotations.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Mutable annotations.
    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    /// The axis.
    pub fn axis(&self) -> &Axis1D<Dbn1D> {
        &self.axis
    }

    /// Regular bins.
    pub fn bins(&self) -> &[HistoBin1D] {
        self.axis.bins()
    }

    /// Regular bin `i`.
    pub fn bin(&self, i: usize) -> Option<&HistoBin1D> {
        self.axis.bin(i)
    }

    /// Number of regular bins.
    pub fn num_bins(&self) -> usize {
        self.axis.num_bins()
    }

    /// Underflow accumulator.
    pub fn underflow(&self) -> &Dbn1D {
        self.axis.underflow()
    }

    /// Overflow accumulator.
    pub fn overflow(&self) -> &Dbn1D {
        self.axis.overflow()
    }

    /// Record `(x, weight)`.
    pub fn fill(&mut self, x: f64, weight: f64) -> Result<BinIndex> {
        self.axis.fill(x, weight).in_object(self.path(), "fill")
    }

    /// Moments of all fills, optionally including underflow and overflow.
    pub fn total_dbn(&self, include_overflows: bool) -> Dbn1D {
        self.axis.total_dbn(include_overflows)
    }

    /// Number of fills.
    pub fn num_entries(&self, include_overflows: bool) -> u64 {
        self.total_dbn(include_overflows).num_entries()
    }

    /// Effective number of fills.
    pub fn eff_num_entries(&self, include_overflows: bool) -> f64 {
        self.total_dbn(include_overflows).eff_num_entries()
    }

    /// `Σw`, i.e. the integral.
    pub fn integral(&self, include_overflows: bool) -> f64 {
        self.total_dbn(include_overflows).sum_w()
    }

    /// `sqrt(Σw²)`.
    pub fn integral_err(&self, include_overflows: bool) -> f64 {
        self.total_dbn(include_overflows).sum_w2().sqrt()
    }

    /// Weighted mean of x.
    pub fn mean(&self, include_overflows: bool) -> f64 {
        self.total_dbn(include_overflows).mean()
    }

    /// Weighted variance of x.
    pub fn variance(&self, include_overflows: bool) -> f64 {
        self.total_dbn(include_overflows).variance()
    }

    /// Weighted standard deviation of x.
    pub fn std_dev(&self, include_overflows: bool) -> f64 {
        self.total_dbn(include_overflows).std_dev()
    }

    /// Standard error on the mean of x.
    pub fn std_err(&self, include_overflows: bool) -> f64 {
        self.total_dbn(include_overflows).std_err()
    }

    /// Multiply all weights (bins and flows) by `factor`.
    pub fn scale_w(&mut self, factor: f64) -> Result<()> {
        if !factor.is_finite() {
            return Err(Error::InvalidInput(format!("non-finite scale factor {factor}")))
                .in_object(self.path(), "scale");
        }
        self.axis.scale_w(factor);
        Ok(())
    }

    /// Scale so that the in-range integral equals `target`.
    ///
    /// Underflow and overflow are scaled too but do not count toward the
    /// integral. A zero integral is reported as [`Error::ZeroIntegral`] and
    /// leaves the histogram unchanged.
    pub fn normalize(&mut self, target: f64) -> Result<()> {
        let area = self.integral(false);
        if area == 0.0 {
            log::warn!("cannot normalize '{}': integral is zero", self.path());
            return Err(Error::ZeroIntegral).in_object(self.path(), "normalize");
        }
        self.scale_w(target / area)
    }

    /// Add another histogram's contents. Both must have identical binning;
    /// on mismatch neither histogram changes.
    pub fn add(&mut self, other: &Histo1D) -> Result<()> {
        self.axis.try_add_assign(&other.axis).in_object(self.path(), "add")
    }

    /// Subtract another histogram's contents.
    pub fn subtract(&mut self, other: &Histo1D) -> Result<()> {
        self.axis.try_sub_assign(&other.axis).in_object(self.path(), "subtract")
    }

    /// Clear all contents.
    pub fn reset(&mut self) {
        self.axis.reset();
    }

    /// New histogram merging every `group` consecutive bins; a short final
    /// group is kept as one bin.
    pub fn rebin(&self, group: usize) -> Result<Histo1D> {
        if group == 0 {
            return Err(Error::InvalidAxis("rebin group must be at least 1".into()))
                .in_object(self.path(), "rebin");
        }
        let old = self.axis.edges();
        let mut new_edges: Vec<f64> = old.iter().step_by(group).copied().collect();
        if (old.len() - 1) % group != 0 {
            new_edges.push(old[old.len() - 1]);
        }
        self.rebin_to(&new_edges)
    }

    /// New histogram whose edges are a subset of this one's.
    pub fn rebin_to(&self, new_edges: &[f64]) -> Result<Histo1D> {
        let axis = self.axis.rebin_to(new_edges).in_object(self.path(), "rebin")?;
        Ok(Histo1D { annotations: self.annotations.clone(), axis })
    }

    /// Uniform-width histogram check used by callers that need equal bins.
    pub fn is_uniform(&self) -> bool {
        let w0 = self.bins()[0].width();
        self.bins().iter().all(|b| edges::fuzzy_equals(b.width(), w0, 1e-9))
    }
}

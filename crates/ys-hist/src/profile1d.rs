//! One-dimensional profile: the mean of `y` as a function of `x`.

use serde::{Deserialize, Serialize};
use ys_core::{Dbn2D, Distribution, Error, Result, ResultExt};

use crate::annotations::{self, Annotations};
use crate::axis::{Axis1D, BinIndex};
use crate::bin::ProfileBin1D;

/// A path-addressed profile over an [`Axis1D`] of [`ProfileBin1D`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile1D {
    annotations: Annotations,
    axis: Axis1D<Dbn2D>,
}

impl Profile1D {
    /// Profile at `path` over an existing axis.
    pub fn new(path: impl Into<String>, axis: Axis1D<Dbn2D>) -> Self {
        Self { annotations: Annotations::with_path(path, ""), axis }
    }

    /// Profile with explicit bin edges.
    pub fn with_edges(path: impl Into<String>, edges: &[f64]) -> Result<Self> {
        let path = path.into();
        let axis = Axis1D::from_edges(edges).in_object(&path, "book")?;
        Ok(Self::new(path, axis))
    }

    /// Profile with `n_bins` equal-width bins over `[lower, upper)`.
    pub fn uniform(path: impl Into<String>, n_bins: usize, lower: f64, upper: f64) -> Result<Self> {
        let path = path.into();
        let axis = Axis1D::uniform(n_bins, lower, upper).in_object(&path, "book")?;
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
    pub fn axis(&self) -> &Axis1D<Dbn2D> {
        &self.axis
    }

    /// Regular bins.
    pub fn bins(&self) -> &[ProfileBin1D] {
        self.axis.bins()
    }

    /// Number of regular bins.
    pub fn num_bins(&self) -> usize {
        self.axis.num_bins()
    }

    /// Underflow accumulator.
    pub fn underflow(&self) -> &Dbn2D {
        self.axis.underflow()
    }

    /// Overflow accumulator.
    pub fn overflow(&self) -> &Dbn2D {
        self.axis.overflow()
    }

    /// Record `y` at control value `x` with `weight`.
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) -> Result<BinIndex> {
        self.axis.fill(x, y, weight).in_object(self.path(), "fill")
    }

    fn dbn_at_x(&self, x: f64) -> Dbn2D {
        self.axis.dbn_at(self.axis.index(x)).copied().unwrap_or_default()
    }

    /// Mean of `y` in the bin (or flow) located by `x`.
    pub fn bin_mean(&self, x: f64) -> f64 {
        self.dbn_at_x(x).mean_y()
    }

    /// RMS of `y` in the bin (or flow) located by `x`.
    pub fn bin_rms(&self, x: f64) -> f64 {
        self.dbn_at_x(x).y().rms()
    }

    /// Standard deviation of `y` in the bin located by `x`.
    pub fn bin_std_dev(&self, x: f64) -> f64 {
        self.dbn_at_x(x).y().std_dev()
    }

    /// Standard error on the mean of `y` in the bin located by `x`.
    pub fn bin_std_err(&self, x: f64) -> f64 {
        self.dbn_at_x(x).y().std_err()
    }

    /// Moments of all fills.
    pub fn total_dbn(&self, include_overflows: bool) -> Dbn2D {
        self.axis.total_dbn(include_overflows)
    }

    /// Number of fills.
    pub fn num_entries(&self, include_overflows: bool) -> u64 {
        self.total_dbn(include_overflows).num_entries()
    }

    /// `Σw`.
    pub fn sum_w(&self, include_overflows: bool) -> f64 {
        self.total_dbn(include_overflows).sum_w()
    }

    /// Multiply all weights by `factor`. Means are unaffected.
    pub fn scale_w(&mut self, factor: f64) -> Result<()> {
        if !factor.is_finite() {
            return Err(Error::InvalidInput(format!("non-finite scale factor {factor}")))
                .in_object(self.path(), "scale");
        }
        self.axis.scale_w(factor);
        Ok(())
    }

    /// Add another profile's contents; binnings must be identical.
    pub fn add(&mut self, other: &Profile1D) -> Result<()> {
        self.axis.try_add_assign(&other.axis).in_object(self.path(), "add")
    }

    /// Subtract another profile's contents.
    pub fn subtract(&mut self, other: &Profile1D) -> Result<()> {
        self.axis.try_sub_assign(&other.axis).in_object(self.path(), "subtract")
    }

    /// Clear all contents.
    pub fn reset(&mut self) {
        self.axis.reset();
    }

    /// New profile whose edges are a subset of this one's.
    pub fn rebin_to(&self, new_edges: &[f64]) -> Result<Profile1D> {
        let axis = self.axis.rebin_to(new_edges).in_object(self.path(), "rebin")?;
        Ok(Profile1D { annotations: self.annotations.clone(), axis })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_of_y_per_bin() {
        let mut p = Profile1D::uniform("/TEST/p", 2, 0.0, 2.0).unwrap();
        p.fill(1.0, 10.0, 1.0).unwrap();
        p.fill(1.0, 20.0, 1.0).unwrap();
        assert_eq!(p.bin_mean(1.2), 15.0);
        assert_eq!(p.bins()[1].num_entries(), 2);
        assert_relative_eq!(p.bin_std_dev(1.2), 5.0);
        assert_relative_eq!(p.bin_std_err(1.2), 5.0 / 2f64.sqrt());
        assert_relative_eq!(p.bin_rms(1.2), 250f64.sqrt());
        assert_eq!(p.bin_mean(0.5), 0.0);
    }

    #[test]
    fn flows_report_their_own_mean() {
        let mut p = Profile1D::uniform("/TEST/p", 2, 0.0, 2.0).unwrap();
        p.fill(5.0, 3.0, 2.0).unwrap();
        assert_eq!(p.bin_mean(7.0), 3.0);
        assert_eq!(p.overflow().num_entries(), 1);
    }

    #[test]
    fn scale_keeps_means() {
        let mut p = Profile1D::uniform("/TEST/p", 1, 0.0, 1.0).unwrap();
        p.fill(0.5, 4.0, 1.0).unwrap();
        p.fill(0.5, 8.0, 3.0).unwrap();
        let mean = p.bin_mean(0.5);
        p.scale_w(10.0).unwrap();
        assert_relative_eq!(p.bin_mean(0.5), mean);
        assert_relative_eq!(p.sum_w(false), 40.0);
    }

    #[test]
    fn add_checks_binning() {
        let mut a = Profile1D::uniform("/TEST/a", 2, 0.0, 2.0).unwrap();
        let b = Profile1D::uniform("/TEST/b", 4, 0.0, 2.0).unwrap();
        let err = a.add(&b).unwrap_err();
        assert!(matches!(err.root(), Error::EdgeMismatch(_)));
        let mut c = a.clone();
        c.fill(0.5, 1.0, 1.0).unwrap();
        a.add(&c).unwrap();
        a.add(&c).unwrap();
        a.subtract(&c).unwrap();
        assert_eq!(a.num_entries(false), 1);
    }

    #[test]
    fn non_finite_y_is_rejected() {
        let mut p = Profile1D::uniform("/TEST/p", 2, 0.0, 2.0).unwrap();
        assert!(p.fill(0.5, f64::INFINITY, 1.0).is_err());
        assert_eq!(p.num_entries(true), 0);
    }
}

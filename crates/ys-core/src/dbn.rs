//! Weighted-moment accumulators.
//!
//! [`Dbn1D`] tracks `Σw`, `Σw²`, `Σwx`, `Σwx²` and the unweighted fill count
//! over a sequence of `(x, w)` fills. [`Dbn2D`] adds the `y` moments and the
//! `Σwxy` cross term. Both are plain running sums: combination is exact
//! element-wise addition, so partial accumulations from independent workers
//! merge associatively.
//!
//! Derived statistics are computed on access. Whenever `Σw == 0` they are
//! defined as `0` rather than NaN.

use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Operations shared by the 1D and 2D accumulators.
///
/// Axes store one accumulator per bin plus underflow/overflow; this trait is
/// what they need to know about it.
pub trait Distribution:
    Clone + Default + std::fmt::Debug + AddAssign + SubAssign + PartialEq
{
    /// Number of fills (unweighted).
    fn num_entries(&self) -> u64;

    /// `Σw`.
    fn sum_w(&self) -> f64;

    /// `Σw²`.
    fn sum_w2(&self) -> f64;

    /// Rescale the weights by `factor`.
    fn scale_w(&mut self, factor: f64);

    /// Clear all sums.
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Effective number of entries, `(Σw)² / Σw²`.
    fn eff_num_entries(&self) -> f64 {
        let sw2 = self.sum_w2();
        if sw2 == 0.0 { 0.0 } else { self.sum_w() * self.sum_w() / sw2 }
    }

    /// True if nothing has been filled.
    fn is_empty(&self) -> bool {
        self.num_entries() == 0
    }
}

fn check_finite(what: &str, v: f64) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("non-finite {what}: {v}")))
    }
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Running weighted moments of one variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dbn1D {
    num_entries: u64,
    sum_w: f64,
    sum_w2: f64,
    sum_wx: f64,
    sum_wx2: f64,
}

impl Dbn1D {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an accumulator from stored sums (e.g. when reading a file).
    ///
    /// Fails with [`Error::InvalidInput`] if any sum is non-finite or
    /// `sum_w2` is negative.
    pub fn from_sums(
        num_entries: u64,
        sum_w: f64,
        sum_w2: f64,
        sum_wx: f64,
        sum_wx2: f64,
    ) -> Result<Self> {
        for (what, v) in [("sumw", sum_w), ("sumw2", sum_w2), ("sumwx", sum_wx), ("sumwx2", sum_wx2)]
        {
            check_finite(what, v)?;
        }
        if sum_w2 < 0.0 {
            return Err(Error::InvalidInput(format!("negative sumw2: {sum_w2}")));
        }
        Ok(Self { num_entries, sum_w, sum_w2, sum_wx, sum_wx2 })
    }

    /// Record one `(x, weight)` observation.
    ///
    /// Negative weights are accepted. Non-finite `x` or `weight` is rejected
    /// with [`Error::InvalidInput`] and leaves the sums untouched.
    pub fn fill(&mut self, x: f64, weight: f64) -> Result<()> {
        check_finite("x", x)?;
        check_finite("weight", weight)?;
        self.num_entries += 1;
        self.sum_w += weight;
        self.sum_w2 += weight * weight;
        self.sum_wx += weight * x;
        self.sum_wx2 += weight * x * x;
        Ok(())
    }

    /// `Σwx`.
    pub fn sum_wx(&self) -> f64 {
        self.sum_wx
    }

    /// `Σwx²`.
    pub fn sum_wx2(&self) -> f64 {
        self.sum_wx2
    }

    /// Weighted mean of x.
    pub fn mean(&self) -> f64 {
        safe_div(self.sum_wx, self.sum_w)
    }

    /// Weighted (population) variance of x, clamped to be non-negative.
    pub fn variance(&self) -> f64 {
        if self.sum_w == 0.0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_wx2 / self.sum_w - mean * mean).max(0.0)
    }

    /// Square root of [`variance`](Self::variance).
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Standard error on the mean, `std_dev / sqrt(num_entries)`.
    pub fn std_err(&self) -> f64 {
        if self.num_entries == 0 {
            0.0
        } else {
            self.std_dev() / (self.num_entries as f64).sqrt()
        }
    }

    /// Root-mean-square of x, `sqrt(Σwx² / Σw)`.
    pub fn rms(&self) -> f64 {
        safe_div(self.sum_wx2, self.sum_w).max(0.0).sqrt()
    }

    /// Rescale the x coordinate: `Σwx` by `factor`, `Σwx²` by `factor²`.
    pub fn scale_x(&mut self, factor: f64) {
        self.sum_wx *= factor;
        self.sum_wx2 *= factor * factor;
    }
}

impl Distribution for Dbn1D {
    fn num_entries(&self) -> u64 {
        self.num_entries
    }

    fn sum_w(&self) -> f64 {
        self.sum_w
    }

    fn sum_w2(&self) -> f64 {
        self.sum_w2
    }

    /// `Σw` and `Σwx` scale with `factor`; `Σw²` and `Σwx²` with `factor²`.
    fn scale_w(&mut self, factor: f64) {
        self.sum_w *= factor;
        self.sum_w2 *= factor * factor;
        self.sum_wx *= factor;
        self.sum_wx2 *= factor * factor;
    }
}

impl AddAssign for Dbn1D {
    fn add_assign(&mut self, rhs: Self) {
        self.num_entries += rhs.num_entries;
        self.sum_w += rhs.sum_w;
        self.sum_w2 += rhs.sum_w2;
        self.sum_wx += rhs.sum_wx;
        self.sum_wx2 += rhs.sum_wx2;
    }
}

impl SubAssign for Dbn1D {
    /// Weights and weighted sums subtract; `Σw²` still adds, since the
    /// uncertainties of both operands contribute. The entry count saturates
    /// at zero.
    fn sub_assign(&mut self, rhs: Self) {
        self.num_entries = self.num_entries.saturating_sub(rhs.num_entries);
        self.sum_w -= rhs.sum_w;
        self.sum_w2 += rhs.sum_w2;
        self.sum_wx -= rhs.sum_wx;
        self.sum_wx2 -= rhs.sum_wx2;
    }
}

impl Add for Dbn1D {
    type Output = Dbn1D;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sub for Dbn1D {
    type Output = Dbn1D;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

/// Running weighted moments of two variables, including the cross term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dbn2D {
    num_entries: u64,
    sum_w: f64,
    sum_w2: f64,
    sum_wx: f64,
    sum_wx2: f64,
    sum_wy: f64,
    sum_wy2: f64,
    sum_wxy: f64,
}

impl Dbn2D {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an accumulator from stored sums.
    #[allow(clippy::too_many_arguments)]
    pub fn from_sums(
        num_entries: u64,
        sum_w: f64,
        sum_w2: f64,
        sum_wx: f64,
        sum_wx2: f64,
        sum_wy: f64,
        sum_wy2: f64,
        sum_wxy: f64,
    ) -> Result<Self> {
        for (what, v) in [
            ("sumw", sum_w),
            ("sumw2", sum_w2),
            ("sumwx", sum_wx),
            ("sumwx2", sum_wx2),
            ("sumwy", sum_wy),
            ("sumwy2", sum_wy2),
            ("sumwxy", sum_wxy),
        ] {
            check_finite(what, v)?;
        }
        if sum_w2 < 0.0 {
            return Err(Error::InvalidInput(format!("negative sumw2: {sum_w2}")));
        }
        Ok(Self { num_entries, sum_w, sum_w2, sum_wx, sum_wx2, sum_wy, sum_wy2, sum_wxy })
    }

    /// Record one `(x, y, weight)` observation.
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) -> Result<()> {
        check_finite("x", x)?;
        check_finite("y", y)?;
        check_finite("weight", weight)?;
        self.num_entries += 1;
        self.sum_w += weight;
        self.sum_w2 += weight * weight;
        self.sum_wx += weight * x;
        self.sum_wx2 += weight * x * x;
        self.sum_wy += weight * y;
        self.sum_wy2 += weight * y * y;
        self.sum_wxy += weight * x * y;
        Ok(())
    }

    /// Projection onto x.
    pub fn x(&self) -> Dbn1D {
        Dbn1D {
            num_entries: self.num_entries,
            sum_w: self.sum_w,
            sum_w2: self.sum_w2,
            sum_wx: self.sum_wx,
            sum_wx2: self.sum_wx2,
        }
    }

    /// Projection onto y.
    pub fn y(&self) -> Dbn1D {
        Dbn1D {
            num_entries: self.num_entries,
            sum_w: self.sum_w,
            sum_w2: self.sum_w2,
            sum_wx: self.sum_wy,
            sum_wx2: self.sum_wy2,
        }
    }

    /// `Σwx`.
    pub fn sum_wx(&self) -> f64 {
        self.sum_wx
    }

    /// `Σwx²`.
    pub fn sum_wx2(&self) -> f64 {
        self.sum_wx2
    }

    /// `Σwy`.
    pub fn sum_wy(&self) -> f64 {
        self.sum_wy
    }

    /// `Σwy²`.
    pub fn sum_wy2(&self) -> f64 {
        self.sum_wy2
    }

    /// `Σwxy`.
    pub fn sum_wxy(&self) -> f64 {
        self.sum_wxy
    }

    /// Weighted mean of x.
    pub fn mean_x(&self) -> f64 {
        self.x().mean()
    }

    /// Weighted mean of y.
    pub fn mean_y(&self) -> f64 {
        self.y().mean()
    }

    /// Weighted covariance of x and y.
    pub fn covariance(&self) -> f64 {
        if self.sum_w == 0.0 {
            return 0.0;
        }
        self.sum_wxy / self.sum_w - self.mean_x() * self.mean_y()
    }

    /// Pearson correlation of x and y; `0` if either variance vanishes.
    pub fn correlation(&self) -> f64 {
        let sx = self.x().std_dev();
        let sy = self.y().std_dev();
        if sx == 0.0 || sy == 0.0 { 0.0 } else { self.covariance() / (sx * sy) }
    }

    /// Rescale x: `Σwx`, `Σwxy` by `factor`, `Σwx²` by `factor²`.
    pub fn scale_x(&mut self, factor: f64) {
        self.sum_wx *= factor;
        self.sum_wx2 *= factor * factor;
        self.sum_wxy *= factor;
    }

    /// Rescale y: `Σwy`, `Σwxy` by `factor`, `Σwy²` by `factor²`.
    pub fn scale_y(&mut self, factor: f64) {
        self.sum_wy *= factor;
        self.sum_wy2 *= factor * factor;
        self.sum_wxy *= factor;
    }
}

impl Distribution for Dbn2D {
    fn num_entries(&self) -> u64 {
        self.num_entries
    }

    fn sum_w(&self) -> f64 {
        self.sum_w
    }

    fn sum_w2(&self) -> f64 {
        self.sum_w2
    }

    fn scale_w(&mut self, factor: f64) {
        self.sum_w *= factor;
        self.sum_w2 *= factor * factor;
        self.sum_wx *= factor;
        self.sum_wx2 *= factor * factor;
        self.sum_wy *= factor;
        self.sum_wy2 *= factor * factor;
        self.sum_wxy *= factor;
    }
}

impl AddAssign for Dbn2D {
    fn add_assign(&mut self, rhs: Self) {
        self.num_entries += rhs.num_entries;
        self.sum_w += rhs.sum_w;
        self.sum_w2 += rhs.sum_w2;
        self.sum_wx += rhs.sum_wx;
        self.sum_wx2 += rhs.sum_wx2;
        self.sum_wy += rhs.sum_wy;
        self.sum_wy2 += rhs.sum_wy2;
        self.sum_wxy += rhs.sum_wxy;
    }
}

impl SubAssign for Dbn2D {
    fn sub_assign(&mut self, rhs: Self) {
        self.num_entries = self.num_entries.saturating_sub(rhs.num_entries);
        self.sum_w -= rhs.sum_w;
        self.sum_w2 += rhs.sum_w2;
        self.sum_wx -= rhs.sum_wx;
        self.sum_wx2 -= rhs.sum_wx2;
        self.sum_wy -= rhs.sum_wy;
        self.sum_wy2 -= rhs.sum_wy2;
        self.sum_wxy -= rhs.sum_wxy;
    }
}

impl Add for Dbn2D {
    type Output = Dbn2D;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sub for Dbn2D {
    type Output = Dbn2D;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use proptest::prelude::*;

    #[test]
    fn unit_weights_count_fills() {
        let mut d = Dbn1D::new();
        for x in [1.0, 2.0, 3.0, 4.0] {
            d.fill(x, 1.0).unwrap();
        }
        assert_eq!(d.num_entries(), 4);
        assert_eq!(d.sum_w(), 4.0);
        assert_eq!(d.sum_w2(), 4.0);
        assert_relative_eq!(d.mean(), 2.5);
        assert_relative_eq!(d.variance(), 1.25);
        assert_relative_eq!(d.std_err(), 1.25f64.sqrt() / 2.0);
        assert_relative_eq!(d.eff_num_entries(), 4.0);
    }

    #[test]
    fn empty_derived_quantities_are_zero() {
        let d = Dbn1D::new();
        assert_eq!(d.mean(), 0.0);
        assert_eq!(d.variance(), 0.0);
        assert_eq!(d.std_dev(), 0.0);
        assert_eq!(d.std_err(), 0.0);
        assert_eq!(d.rms(), 0.0);
        assert_eq!(d.eff_num_entries(), 0.0);
        assert!(d.is_empty());
    }

    #[test]
    fn cancelling_weights_do_not_produce_nan() {
        let mut d = Dbn1D::new();
        d.fill(1.0, 2.0).unwrap();
        d.fill(3.0, -2.0).unwrap();
        assert_eq!(d.num_entries(), 2);
        assert_eq!(d.sum_w(), 0.0);
        assert_eq!(d.mean(), 0.0);
        assert_eq!(d.variance(), 0.0);
        assert_eq!(d.sum_w2(), 8.0);
    }

    #[test]
    fn non_finite_fill_is_rejected() {
        let mut d = Dbn1D::new();
        assert!(matches!(d.fill(f64::NAN, 1.0), Err(Error::InvalidInput(_))));
        assert!(matches!(d.fill(1.0, f64::INFINITY), Err(Error::InvalidInput(_))));
        assert!(d.is_empty());
        assert_eq!(d, Dbn1D::new());
    }

    #[test]
    fn scale_w_is_quadratic_in_squared_sums() {
        let mut d = Dbn1D::new();
        d.fill(2.0, 1.0).unwrap();
        d.fill(4.0, 3.0).unwrap();
        let mean = d.mean();
        d.scale_w(2.0);
        assert_relative_eq!(d.sum_w(), 8.0);
        assert_relative_eq!(d.sum_w2(), 40.0);
        assert_relative_eq!(d.sum_wx(), 28.0);
        // 2² * (1*4 + 3*16)
        assert_relative_eq!(d.sum_wx2(), 208.0);
        assert_relative_eq!(d.mean(), mean);
        assert_eq!(d.num_entries(), 2);

        let mut d2 = Dbn2D::new();
        d2.fill(1.0, 3.0, 2.0).unwrap();
        d2.scale_w(-3.0);
        assert_relative_eq!(d2.sum_wy(), -18.0);
        assert_relative_eq!(d2.sum_wy2(), 162.0);
        assert_relative_eq!(d2.sum_wxy(), -18.0);
        assert_relative_eq!(d2.sum_wx2(), 18.0);
    }

    #[test]
    fn from_sums_validates() {
        assert!(Dbn1D::from_sums(1, 1.0, -1.0, 0.0, 0.0).is_err());
        assert!(Dbn1D::from_sums(1, f64::NAN, 1.0, 0.0, 0.0).is_err());
        let d = Dbn1D::from_sums(2, 2.0, 2.0, 3.0, 5.0).unwrap();
        assert_relative_eq!(d.mean(), 1.5);
    }

    #[test]
    fn subtraction_adds_uncertainties() {
        let mut a = Dbn1D::new();
        a.fill(1.0, 3.0).unwrap();
        let mut b = Dbn1D::new();
        b.fill(1.0, 1.0).unwrap();
        let c = a - b;
        assert_eq!(c.sum_w(), 2.0);
        assert_eq!(c.sum_w2(), 10.0);
        assert_eq!(c.num_entries(), 0);
    }

    #[test]
    fn dbn2d_covariance() {
        let mut d = Dbn2D::new();
        d.fill(1.0, 2.0, 1.0).unwrap();
        d.fill(2.0, 4.0, 1.0).unwrap();
        d.fill(3.0, 6.0, 1.0).unwrap();
        assert_relative_eq!(d.mean_x(), 2.0);
        assert_relative_eq!(d.mean_y(), 4.0);
        assert_relative_eq!(d.covariance(), 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(d.correlation(), 1.0, epsilon = 1e-12);
        assert_eq!(d.y().num_entries(), 3);
    }

    #[test]
    fn dbn2d_scale_axes() {
        let mut d = Dbn2D::new();
        d.fill(1.0, 10.0, 1.0).unwrap();
        d.fill(1.0, 20.0, 1.0).unwrap();
        d.scale_y(0.1);
        assert_relative_eq!(d.mean_y(), 1.5);
        d.scale_x(3.0);
        assert_relative_eq!(d.mean_x(), 3.0);
        assert_abs_diff_eq!(d.covariance(), 0.0, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn merge_equals_union(
            xs in proptest::collection::vec((-1e3f64..1e3, -5.0f64..5.0), 0..64),
            split in 0usize..64,
        ) {
            let split = split.min(xs.len());
            let mut whole = Dbn1D::new();
            let mut a = Dbn1D::new();
            let mut b = Dbn1D::new();
            for (i, &(x, w)) in xs.iter().enumerate() {
                whole.fill(x, w).unwrap();
                if i < split { a.fill(x, w).unwrap() } else { b.fill(x, w).unwrap() }
            }
            let merged = a + b;
            prop_assert_eq!(merged.num_entries(), whole.num_entries());
            prop_assert!((merged.sum_w() - whole.sum_w()).abs() <= 1e-9 * (1.0 + whole.sum_w().abs()));
            prop_assert!((merged.sum_wx2() - whole.sum_wx2()).abs() <= 1e-9 * (1.0 + whole.sum_wx2().abs()));
        }

        #[test]
        fn scale_round_trip(
            xs in proptest::collection::vec((-1e3f64..1e3, -5.0f64..5.0), 1..32),
            k in prop_oneof![0.01f64..100.0, -100.0f64..-0.01],
        ) {
            let mut d = Dbn2D::new();
            for &(x, w) in &xs {
                d.fill(x, 2.0 * x, w).unwrap();
            }
            let orig = d;
            d.scale_w(k);
            d.scale_w(1.0 / k);
            let tol = |a: f64| 1e-9 * (1.0 + a.abs());
            prop_assert!((d.sum_w() - orig.sum_w()).abs() <= tol(orig.sum_w()));
            prop_assert!((d.sum_w2() - orig.sum_w2()).abs() <= tol(orig.sum_w2()));
            prop_assert!((d.sum_wxy() - orig.sum_wxy()).abs() <= tol(orig.sum_wxy()));
            prop_assert!((d.sum_wy2() - orig.sum_wy2()).abs() <= tol(orig.sum_wy2()));
            prop_assert!((d.sum_wx2() - orig.sum_wx2()).abs() <= tol(orig.sum_wx2()));

            let mut scaled = orig;
            scaled.scale_w(k);
            let k2 = k * k;
            prop_assert!((scaled.sum_w2() - k2 * orig.sum_w2()).abs() <= tol(k2 * orig.sum_w2()));
            prop_assert!((scaled.sum_wy2() - k2 * orig.sum_wy2()).abs() <= tol(k2 * orig.sum_wy2()));
        }
    }
}

//! One-dimensional binning: ordered contiguous bins plus underflow/overflow.
//!
//! The bin structure of an [`Axis1D`] is fixed at construction. Only the bin
//! contents change after that, through `fill`, `scale_w` and the checked
//! add/subtract operations. Anything that changes the binning (see
//! [`Axis1D::merge_bins`]) builds a new axis.

use serde::{Deserialize, Serialize};
use ys_core::{Dbn1D, Dbn2D, Distribution, Error, Result};

use crate::bin::Bin1D;
use crate::edges;

/// Where a coordinate lands on an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinIndex {
    /// Below the first bin's lower edge.
    Underflow,
    /// Regular bin.
    Bin(usize),
    /// At or above the last bin's upper edge.
    Overflow,
}

/// Contiguous half-open bins with underflow and overflow accumulators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis1D<D> {
    edges: Vec<f64>,
    bins: Vec<Bin1D<D>>,
    underflow: D,
    overflow: D,
}

impl<D: Distribution> Axis1D<D> {
    /// Axis with one bin per consecutive pair of `edges`.
    ///
    /// Fails with [`Error::InvalidAxis`] unless the edges are finite, strictly
    /// increasing and at least two.
    pub fn from_edges(edges: &[f64]) -> Result<Self> {
        edges::validate(edges)?;
        let bins = edges
            .windows(2)
            .map(|w| Bin1D::new(w[0], w[1]))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { edges: edges.to_vec(), bins, underflow: D::default(), overflow: D::default() })
    }

    /// `n_bins` equal-width bins over `[lower, upper)`.
    pub fn uniform(n_bins: usize, lower: f64, upper: f64) -> Result<Self> {
        Self::from_edges(&edges::linspace(n_bins, lower, upper)?)
    }

    /// `n_bins` logarithmically spaced bins over `[lower, upper)`, `lower > 0`.
    pub fn log(n_bins: usize, lower: f64, upper: f64) -> Result<Self> {
        Self::from_edges(&edges::logspace(n_bins, lower, upper)?)
    }

    /// Assemble an axis from filled bins, e.g. when reading a file.
    ///
    /// The bins must be contiguous and in ascending order.
    pub fn from_bins(bins: Vec<Bin1D<D>>, underflow: D, overflow: D) -> Result<Self> {
        let Some(first) = bins.first() else {
            return Err(Error::InvalidAxis("axis needs at least one bin".into()));
        };
        let mut edges = Vec::with_capacity(bins.len() + 1);
        edges.push(first.x_low());
        for (i, b) in bins.iter().enumerate() {
            let prev = edges[edges.len() - 1];
            if b.x_low() != prev {
                return Err(Error::InvalidAxis(format!(
                    "bin {} starts at {} but previous bin ends at {}",
                    i,
                    b.x_low(),
                    prev
                )));
            }
            edges.push(b.x_high());
        }
        Ok(Self { edges, bins, underflow, overflow })
    }

    /// Resolve `x` to a bin, using `[low, high)` intervals.
    ///
    /// NaN never lies inside the range and is reported as overflow; fills
    /// reject it before it is stored.
    pub fn index(&self, x: f64) -> BinIndex {
        if x < self.x_min() {
            return BinIndex::Underflow;
        }
        match edges::find_bin(&self.edges, x) {
            Some(i) => BinIndex::Bin(i),
            None => BinIndex::Overflow,
        }
    }

    /// Number of regular bins.
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// All bin edges, `num_bins() + 1` values.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower edge of the first bin.
    pub fn x_min(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the last bin.
    pub fn x_max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Regular bins.
    pub fn bins(&self) -> &[Bin1D<D>] {
        &self.bins
    }

    /// Regular bin `i`.
    pub fn bin(&self, i: usize) -> Option<&Bin1D<D>> {
        self.bins.get(i)
    }

    /// Bin containing `x`, if any.
    pub fn bin_at(&self, x: f64) -> Option<&Bin1D<D>> {
        match self.index(x) {
            BinIndex::Bin(i) => self.bins.get(i),
            _ => None,
        }
    }

    /// Underflow accumulator.
    pub fn underflow(&self) -> &D {
        &self.underflow
    }

    /// Overflow accumulator.
    pub fn overflow(&self) -> &D {
        &self.overflow
    }

    /// Accumulator at `idx`: a regular bin's, or underflow/overflow.
    pub fn dbn_at(&self, idx: BinIndex) -> Option<&D> {
        match idx {
            BinIndex::Underflow => Some(&self.underflow),
            BinIndex::Overflow => Some(&self.overflow),
            BinIndex::Bin(i) => self.bins.get(i).map(Bin1D::dbn),
        }
    }

    /// Sum over regular bins, optionally including underflow and overflow.
    pub fn total_dbn(&self, include_overflows: bool) -> D {
        let mut total = D::default();
        for b in &self.bins {
            total += b.dbn().clone();
        }
        if include_overflows {
            total += self.underflow.clone();
            total += self.overflow.clone();
        }
        total
    }

    /// Rescale the weights of every bin and of underflow/overflow.
    pub fn scale_w(&mut self, factor: f64) {
        for b in &mut self.bins {
            b.scale_w(factor);
        }
        self.underflow.scale_w(factor);
        self.overflow.scale_w(factor);
    }

    /// Clear all contents, keeping the binning.
    pub fn reset(&mut self) {
        for b in &mut self.bins {
            b.reset();
        }
        self.underflow.reset();
        self.overflow.reset();
    }

    /// True if both axes have identical edges.
    pub fn same_binning(&self, other: &Self) -> bool {
        self.edges == other.edges
    }

    /// Fail with [`Error::EdgeMismatch`] unless the binnings are identical.
    pub fn check_same_binning(&self, other: &Self) -> Result<()> {
        if self.same_binning(other) {
            return Ok(());
        }
        if self.num_bins() != other.num_bins() {
            return Err(Error::EdgeMismatch(format!(
                "{} bins vs {} bins",
                self.num_bins(),
                other.num_bins()
            )));
        }
        let i = self.edges.iter().zip(&other.edges).position(|(a, b)| a != b).unwrap_or(0);
        Err(Error::EdgeMismatch(format!(
            "edge {} differs: {} vs {}",
            i, self.edges[i], other.edges[i]
        )))
    }

    /// Add `other`'s contents bin by bin. Leaves `self` untouched on mismatch.
    pub fn try_add_assign(&mut self, other: &Self) -> Result<()> {
        self.check_same_binning(other)?;
        for (a, b) in self.bins.iter_mut().zip(&other.bins) {
            a.try_add_assign(b)?;
        }
        self.underflow += other.underflow.clone();
        self.overflow += other.overflow.clone();
        Ok(())
    }

    /// Subtract `other`'s contents bin by bin. Leaves `self` untouched on mismatch.
    pub fn try_sub_assign(&mut self, other: &Self) -> Result<()> {
        self.check_same_binning(other)?;
        for (a, b) in self.bins.iter_mut().zip(&other.bins) {
            a.try_sub_assign(b)?;
        }
        self.underflow -= other.underflow.clone();
        self.overflow -= other.overflow.clone();
        Ok(())
    }

    /// New axis with bins `from..=to` merged into a single bin.
    pub fn merge_bins(&self, from: usize, to: usize) -> Result<Self> {
        if from > to || to >= self.num_bins() {
            return Err(Error::InvalidAxis(format!(
                "cannot merge bins {from}..={to} on an axis with {} bins",
                self.num_bins()
            )));
        }
        let mut bins = Vec::with_capacity(self.num_bins() - (to - from));
        bins.extend_from_slice(&self.bins[..from]);
        let mut merged = self.bins[from].clone();
        for b in &self.bins[from + 1..=to] {
            merged = merged.merge_adjacent(b)?;
        }
        bins.push(merged);
        bins.extend_from_slice(&self.bins[to + 1..]);
        Self::from_bins(bins, self.underflow.clone(), self.overflow.clone())
    }

    /// New axis whose edges are the subset `new_edges` of this axis's edges.
    ///
    /// Bins below the first new edge move into underflow, bins at or above
    /// the last new edge into overflow.
    pub fn rebin_to(&self, new_edges: &[f64]) -> Result<Self> {
        edges::validate(new_edges)?;
        let mut positions = Vec::with_capacity(new_edges.len());
        for &e in new_edges {
            let pos = self.edges.iter().position(|&old| edges::fuzzy_equals(old, e, 1e-12));
            match pos {
                Some(p) => positions.push(p),
                None => {
                    return Err(Error::InvalidAxis(format!(
                        "new edge {e} is not an edge of the existing axis"
                    )));
                }
            }
        }
        if !positions.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InvalidAxis(
                "new edges collapse onto the same existing edge".to_string(),
            ));
        }

        let mut underflow = self.underflow.clone();
        for b in &self.bins[..positions[0]] {
            underflow += b.dbn().clone();
        }
        let mut overflow = self.overflow.clone();
        for b in &self.bins[positions[positions.len() - 1]..] {
            overflow += b.dbn().clone();
        }

        let mut bins = Vec::with_capacity(positions.len() - 1);
        for w in positions.windows(2) {
            let mut merged = self.bins[w[0]].clone();
            for b in &self.bins[w[0] + 1..w[1]] {
                merged = merged.merge_adjacent(b)?;
            }
            bins.push(merged);
        }
        Self::from_bins(bins, underflow, overflow)
    }
}

impl Axis1D<Dbn1D> {
    /// Route `(x, weight)` to its bin or to underflow/overflow.
    ///
    /// Never rejects on range; only non-finite input is refused.
    pub fn fill(&mut self, x: f64, weight: f64) -> Result<BinIndex> {
        let idx = self.index(x);
        match idx {
            BinIndex::Underflow => self.underflow.fill(x, weight)?,
            BinIndex::Overflow => self.overflow.fill(x, weight)?,
            BinIndex::Bin(i) => self.bins[i].fill(x, weight)?,
        }
        Ok(idx)
    }
}

impl Axis1D<Dbn2D> {
    /// Route `(x, y, weight)` to the bin located by `x`.
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) -> Result<BinIndex> {
        let idx = self.index(x);
        match idx {
            BinIndex::Underflow => self.underflow.fill(x, y, weight)?,
            BinIndex::Overflow => self.overflow.fill(x, y, weight)?,
            BinIndex::Bin(i) => self.bins[i].fill(x, y, weight)?,
        }
        Ok(idx)
    }
}

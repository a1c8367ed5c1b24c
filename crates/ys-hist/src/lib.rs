//! # ys-hist
//!
//! Binned and unbinned analysis objects for YStat: weighted 1D histograms,
//! profiles and scatters, the registry that owns them, and the analysis
//! lifecycle that books, fills and finalizes them.
//!
//! ```
//! use ys_hist::Histo1D;
//!
//! let mut h = Histo1D::uniform("/ANA/x", 4, 0.0, 4.0).unwrap();
//! h.fill(0.5, 1.0).unwrap();
//! h.fill(2.5, 3.0).unwrap();
//! h.fill(9.0, 1.0).unwrap();
//! assert_eq!(h.integral(false), 4.0);
//! assert_eq!(h.integral(true), 5.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod annotations;
pub mod axis;
pub mod bin;
pub mod convert;
pub mod edges;
pub mod histo1d;
pub mod object;
pub mod profile1d;
pub mod registry;
pub mod scatter2d;

pub use analysis::{
    Analysis, AnalysisFactory, AnalysisHandler, Booker, Event, FillStats, Filler, Finalizer,
    HandlerConfig, InvalidFillPolicy,
};
pub use annotations::Annotations;
pub use axis::{Axis1D, BinIndex};
pub use bin::{Bin1D, HistoBin1D, HistoBin2D, ProfileBin1D};
pub use edges::DEFAULT_EDGE_TOLERANCE;
pub use histo1d::Histo1D;
pub use object::{AnalysisObject, ObjectKind};
pub use profile1d::Profile1D;
pub use registry::Registry;
pub use scatter2d::{Point2D, Scatter2D};

pub use ys_core::{Dbn1D, Dbn2D, Distribution, Error, Result};

//! # ys-core
//!
//! Weighted-moment accumulators and the shared error taxonomy for YStat.
//!
//! Every binned container in `ys-hist` stores one of the accumulators defined
//! here per bin, plus two more for underflow and overflow.
//!
//! ```
//! use ys_core::{Dbn1D, Distribution};
//!
//! let mut d = Dbn1D::new();
//! d.fill(1.0, 1.0).unwrap();
//! d.fill(3.0, 1.0).unwrap();
//! assert_eq!(d.mean(), 2.0);
//! assert_eq!(d.num_entries(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dbn;
pub mod error;

pub use dbn::{Dbn1D, Dbn2D, Distribution};
pub use error::{Error, Result, ResultExt};

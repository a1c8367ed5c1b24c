//! # ys-io
//!
//! Persistence for YStat analysis objects: the YODA flat-text format
//! (read and write) and legacy AIDA XML (write, and read for reference
//! data).
//!
//! ```
//! use ys_hist::{AnalysisObject, Histo1D};
//!
//! let mut h = Histo1D::uniform("/ANA/x", 2, 0.0, 2.0).unwrap();
//! h.fill(0.5, 1.0).unwrap();
//! let obj = AnalysisObject::from(h);
//! let text = ys_io::to_yoda_string(&obj).unwrap();
//! let back = ys_io::read_yoda_str(&text).unwrap();
//! assert_eq!(back[0].path(), "/ANA/x");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aida;
pub mod format;
pub mod reader;
pub mod writer;

pub use aida::read_aida_str;
pub use reader::{read_path, read_str, read_yoda_str};
pub use writer::{
    Format, to_yoda_string, write, write_aida_all, write_path, write_yoda, write_yoda_all,
};

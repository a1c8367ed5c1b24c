//! Error types for YStat

use thiserror::Error;

/// YStat error type
#[derive(Error, Debug)]
pub enum Error {
    /// Non-finite or otherwise unusable fill argument
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Degenerate or non-increasing bin edges
    #[error("invalid axis: {0}")]
    InvalidAxis(String),

    /// Fill coordinate outside a bin's half-open range
    #[error("coordinate {x} outside bin range [{low}, {high})")]
    OutOfRange {
        /// Offending coordinate.
        x: f64,
        /// Bin lower edge.
        low: f64,
        /// Bin upper edge.
        high: f64,
    },

    /// Two bins (or axes) with different edges were combined
    #[error("edge mismatch: {0}")]
    EdgeMismatch(String),

    /// Two objects of incompatible kind or size were combined
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Object kind or file format not supported by a reader/writer
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Malformed YODA text input
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number in the input.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// Normalization requested on a histogram with zero integral
    #[error("zero integral, cannot normalize")]
    ZeroIntegral,

    /// Registry lookup failed
    #[error("no object registered at '{0}'")]
    NotFound(String),

    /// Registry already holds an object at this path
    #[error("an object is already registered at '{0}'")]
    DuplicatePath(String),

    /// Path is not an absolute, well-formed object path
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// Malformed AIDA XML input
    #[error("XML error: {0}")]
    Xml(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error raised by an operation on a named analysis object
    #[error("{op} on '{path}': {source}")]
    Object {
        /// Object path.
        path: String,
        /// Operation that failed (e.g. `fill`, `add`).
        op: &'static str,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Strip any [`Error::Object`] context and return the underlying error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Object { source, .. } => source.root(),
            other => other,
        }
    }

    /// True if the underlying error is [`Error::ZeroIntegral`].
    pub fn is_zero_integral(&self) -> bool {
        matches!(self.root(), Error::ZeroIntegral)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Attach object path and operation context to an error.
pub trait ResultExt<T> {
    /// Wrap the error (if any) in [`Error::Object`].
    fn in_object(self, path: &str, op: &'static str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn in_object(self, path: &str, op: &'static str) -> Result<T> {
        self.map_err(|e| match e {
            // Keep the innermost path; re-wrapping would only repeat it.
            e @ Error::Object { .. } => e,
            e => Error::Object { path: path.to_string(), op, source: Box::new(e) },
        })
    }
}

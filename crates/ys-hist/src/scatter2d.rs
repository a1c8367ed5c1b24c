//! Explicit (x, y) points with asymmetric errors.

use serde::{Deserialize, Serialize};
use ys_core::{Error, Result, ResultExt};

use crate::annotations::{self, Annotations};

/// A point with independent minus/plus errors on x and y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// x value.
    pub x: f64,
    /// Error below x.
    pub x_err_minus: f64,
    /// Error above x.
    pub x_err_plus: f64,
    /// y value.
    pub y: f64,
    /// Error below y.
    pub y_err_minus: f64,
    /// Error above y.
    pub y_err_plus: f64,
}

impl Point2D {
    /// Point with asymmetric errors. Values must be finite and errors
    /// non-negative.
    pub fn new(
        x: f64,
        y: f64,
        x_err_minus: f64,
        x_err_plus: f64,
        y_err_minus: f64,
        y_err_plus: f64,
    ) -> Result<Self> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(Error::InvalidInput(format!("non-finite point ({x}, {y})")));
        }
        for e in [x_err_minus, x_err_plus, y_err_minus, y_err_plus] {
            if !(e.is_finite() && e >= 0.0) {
                return Err(Error::InvalidInput(format!("invalid error {e} on point ({x}, {y})")));
            }
        }
        Ok(Self { x, x_err_minus, x_err_plus, y, y_err_minus, y_err_plus })
    }

    /// Point with symmetric errors.
    pub fn symmetric(x: f64, y: f64, x_err: f64, y_err: f64) -> Result<Self> {
        Self::new(x, y, x_err, x_err, y_err, y_err)
    }

    /// `x - x_err_minus`.
    pub fn x_min(&self) -> f64 {
        self.x - self.x_err_minus
    }

    /// `x + x_err_plus`.
    pub fn x_max(&self) -> f64 {
        self.x + self.x_err_plus
    }

    /// `y - y_err_minus`.
    pub fn y_min(&self) -> f64 {
        self.y - self.y_err_minus
    }

    /// `y + y_err_plus`.
    pub fn y_max(&self) -> f64 {
        self.y + self.y_err_plus
    }

    /// Mean of the two y errors.
    pub fn y_err_avg(&self) -> f64 {
        0.5 * (self.y_err_minus + self.y_err_plus)
    }

    /// Multiply x and its errors by `factor`; a negative factor swaps the
    /// error directions.
    pub fn scale_x(&mut self, factor: f64) {
        self.x *= factor;
        let (lo, hi) = scaled_errors(self.x_err_minus, self.x_err_plus, factor);
        self.x_err_minus = lo;
        self.x_err_plus = hi;
    }

    /// Multiply y and its errors by `factor`.
    pub fn scale_y(&mut self, factor: f64) {
        self.y *= factor;
        let (lo, hi) = scaled_errors(self.y_err_minus, self.y_err_plus, factor);
        self.y_err_minus = lo;
        self.y_err_plus = hi;
    }
}

fn scaled_errors(minus: f64, plus: f64, factor: f64) -> (f64, f64) {
    let k = factor.abs();
    if factor < 0.0 { (plus * k, minus * k) } else { (minus * k, plus * k) }
}

/// A path-addressed, ordered list of [`Point2D`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatter2D {
    annotations: Annotations,
    points: Vec<Point2D>,
}

impl Scatter2D {
    /// Empty scatter at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { annotations: Annotations::with_path(path, ""), points: Vec::new() }
    }

    /// Scatter with the given points, kept in order.
    pub fn with_points(path: impl Into<String>, points: Vec<Point2D>) -> Self {
        Self { annotations: Annotations::with_path(path, ""), points }
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

    /// Append a point; no sorting is applied.
    pub fn add_point(
        &mut self,
        x: f64,
        y: f64,
        x_err_minus: f64,
        x_err_plus: f64,
        y_err_minus: f64,
        y_err_plus: f64,
    ) -> Result<()> {
        let p = Point2D::new(x, y, x_err_minus, x_err_plus, y_err_minus, y_err_plus)
            .in_object(self.path(), "add_point")?;
        self.points.push(p);
        Ok(())
    }

    /// Append an already-built point.
    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    /// Points in insertion order.
    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    /// Point `i`.
    pub fn point(&self, i: usize) -> Option<&Point2D> {
        self.points.get(i)
    }

    /// Mutable point `i`.
    pub fn point_mut(&mut self, i: usize) -> Option<&mut Point2D> {
        self.points.get_mut(i)
    }

    /// Number of points.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Scale all x values and errors.
    pub fn scale_x(&mut self, factor: f64) {
        self.points.iter_mut().for_each(|p| p.scale_x(factor));
    }

    /// Scale all y values and errors.
    pub fn scale_y(&mut self, factor: f64) {
        self.points.iter_mut().for_each(|p| p.scale_y(factor));
    }

    /// Append all points of `other`.
    pub fn combine(&mut self, other: &Scatter2D) {
        self.points.extend_from_slice(&other.points);
    }

    /// Smallest `x - x_err_minus` over all points.
    pub fn x_min(&self) -> Option<f64> {
        self.points.iter().map(Point2D::x_min).reduce(f64::min)
    }

    /// Largest `x + x_err_plus` over all points.
    pub fn x_max(&self) -> Option<f64> {
        self.points.iter().map(Point2D::x_max).reduce(f64::max)
    }

    /// Smallest `y - y_err_minus` over all points.
    pub fn y_min(&self) -> Option<f64> {
        self.points.iter().map(Point2D::y_min).reduce(f64::min)
    }

    /// Largest `y + y_err_plus` over all points.
    pub fn y_max(&self) -> Option<f64> {
        self.points.iter().map(Point2D::y_max).reduce(f64::max)
    }

    /// Add another scatter point by point: x values must coincide, y values
    /// add and y errors combine in quadrature.
    pub fn add(&mut self, other: &Scatter2D) -> Result<()> {
        self.check_same_shape(other).in_object(self.path(), "add")?;
        for (a, b) in self.points.iter_mut().zip(&other.points) {
            a.y += b.y;
            a.y_err_minus = a.y_err_minus.hypot(b.y_err_minus);
            a.y_err_plus = a.y_err_plus.hypot(b.y_err_plus);
        }
        Ok(())
    }

    /// Fail with [`Error::ShapeMismatch`] unless both scatters have the same
    /// number of points at the same x positions.
    pub fn check_same_shape(&self, other: &Scatter2D) -> Result<()> {
        if self.points.len() != other.points.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} points vs {} points",
                self.points.len(),
                other.points.len()
            )));
        }
        for (i, (a, b)) in self.points.iter().zip(&other.points).enumerate() {
            if a.x != b.x || a.x_err_minus != b.x_err_minus || a.x_err_plus != b.x_err_plus {
                return Err(Error::ShapeMismatch(format!(
                    "point {i} at x = {} vs x = {}",
                    a.x, b.x
                )));
            }
        }
        Ok(())
    }
}

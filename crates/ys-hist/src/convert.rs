//! Conversions between binned objects and scatters.

use ys_core::{Distribution, Result, ResultExt};

use crate::axis::Axis1D;
use crate::annotations;
use crate::edges;
use crate::histo1d::Histo1D;
use crate::profile1d::Profile1D;
use crate::scatter2d::{Point2D, Scatter2D};

/// Bin heights of `h` as points at the bin midpoints, with x errors
/// spanning the bin and symmetric y errors.
pub fn histo_to_scatter(h: &Histo1D) -> Scatter2D {
    let points = h
        .bins()
        .iter()
        .map(|b| Point2D {
            x: b.x_mid(),
            x_err_minus: 0.5 * b.width(),
            x_err_plus: 0.5 * b.width(),
            y: b.height(),
            y_err_minus: b.height_err(),
            y_err_plus: b.height_err(),
        })
        .collect();
    let mut s = Scatter2D::with_points(h.path(), points);
    copy_annotations(h.annotations().iter(), &mut s);
    s
}

/// Bin means of `p` as points, with the standard error on the mean as the
/// y error.
pub fn profile_to_scatter(p: &Profile1D) -> Scatter2D {
    let points = p
        .bins()
        .iter()
        .map(|b| Point2D {
            x: b.x_mid(),
            x_err_minus: 0.5 * b.width(),
            x_err_plus: 0.5 * b.width(),
            y: b.mean(),
            y_err_minus: b.std_err(),
            y_err_plus: b.std_err(),
        })
        .collect();
    let mut s = Scatter2D::with_points(p.path(), points);
    copy_annotations(p.annotations().iter(), &mut s);
    s
}

fn copy_annotations<'a>(src: impl Iterator<Item = (&'a str, &'a str)>, dst: &mut Scatter2D) {
    for (k, v) in src.filter(|(k, _)| *k != annotations::PATH) {
        dst.annotations_mut().insert(k, v);
    }
}

/// Bin-by-bin ratio `num / den` as a scatter at `path`.
///
/// Binnings must match. Relative errors add in quadrature; bins with an
/// empty denominator yield `y = 0` with zero error.
pub fn divide(path: &str, num: &Histo1D, den: &Histo1D) -> Result<Scatter2D> {
    num.axis().check_same_binning(den.axis()).in_object(path, "divide")?;
    let mut points = Vec::with_capacity(num.num_bins());
    for (a, b) in num.bins().iter().zip(den.bins()) {
        let (y, err) = if b.area() == 0.0 {
            log::debug!("{path}: empty denominator in bin [{}, {})", b.x_low(), b.x_high());
            (0.0, 0.0)
        } else {
            let y = a.area() / b.area();
            let rel = a.rel_err().hypot(b.rel_err());
            (y, (y * rel).abs())
        };
        points.push(Point2D {
            x: a.x_mid(),
            x_err_minus: 0.5 * a.width(),
            x_err_plus: 0.5 * a.width(),
            y,
            y_err_minus: err,
            y_err_plus: err,
        });
    }
    Ok(Scatter2D::with_points(path, points))
}

/// Book an empty histogram at `path` whose bins follow the x ranges of a
/// reference scatter. Near-coincident edges merge within `tolerance`.
pub fn histo_from_reference(path: &str, reference: &Scatter2D, tolerance: f64) -> Result<Histo1D> {
    let edges = edges::edges_from_ranges(
        reference.points().iter().map(|p| (p.x_min(), p.x_max())),
        tolerance,
    )
    .in_object(path, "book")?;
    let axis = Axis1D::from_edges(&edges).in_object(path, "book")?;
    let mut h = Histo1D::new(path, axis);
    h.set_title(reference.title());
    Ok(h)
}

/// Book an empty profile at `path` following a reference scatter's binning.
pub fn profile_from_reference(
    path: &str,
    reference: &Scatter2D,
    tolerance: f64,
) -> Result<Profile1D> {
    let edges = edges::edges_from_ranges(
        reference.points().iter().map(|p| (p.x_min(), p.x_max())),
        tolerance,
    )
    .in_object(path, "book")?;
    let mut p = Profile1D::with_edges(path, &edges)?;
    p.set_title(reference.title());
    Ok(p)
}

/// Total weight of a histogram's in-range bins, as a one-point scatter
/// spanning the axis (a cross-section style summary).
pub fn integral_to_scatter(path: &str, h: &Histo1D) -> Result<Scatter2D> {
    let total = h.total_dbn(false);
    let (lo, hi) = (h.axis().x_min(), h.axis().x_max());
    let mid = 0.5 * (lo + hi);
    let err = total.sum_w2().sqrt();
    let mut s = Scatter2D::new(path);
    s.add_point(mid, total.sum_w(), mid - lo, hi - mid, err, err)?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::DEFAULT_EDGE_TOLERANCE;
    use approx::assert_relative_eq;
    use ys_core::Error;

    #[test]
    fn histo_to_scatter_heights() {
        let mut h = Histo1D::with_edges("/A/h", &[0.0, 1.0, 3.0]).unwrap().with_title("t");
        h.fill(0.5, 2.0).unwrap();
        h.fill(2.0, 4.0).unwrap();
        let s = histo_to_scatter(&h);
        assert_eq!(s.path(), "/A/h");
        assert_eq!(s.title(), "t");
        assert_eq!(s.num_points(), 2);
        let p = s.points()[1];
        assert_eq!(p.x, 2.0);
        assert_eq!(p.x_err_minus, 1.0);
        assert_eq!(p.y, 2.0);
        assert_eq!(p.y_err_plus, 2.0);
    }

    #[test]
    fn profile_to_scatter_means() {
        let mut p = Profile1D::uniform("/A/p", 1, 0.0, 2.0).unwrap();
        p.fill(1.0, 10.0, 1.0).unwrap();
        p.fill(1.0, 20.0, 1.0).unwrap();
        let s = profile_to_scatter(&p);
        assert_eq!(s.points()[0].y, 15.0);
        assert_relative_eq!(s.points()[0].y_err_minus, 5.0 / 2f64.sqrt());
    }

    #[test]
    fn divide_histograms() {
        let mut a = Histo1D::uniform("/A/num", 2, 0.0, 2.0).unwrap();
        let mut b = Histo1D::uniform("/A/den", 2, 0.0, 2.0).unwrap();
        a.fill(0.5, 1.0).unwrap();
        b.fill(0.5, 1.0).unwrap();
        b.fill(0.5, 1.0).unwrap();
        let r = divide("/A/ratio", &a, &b).unwrap();
        assert_eq!(r.points()[0].y, 0.5);
        assert_relative_eq!(r.points()[0].y_err_minus, 0.5 * (1.0f64 + 0.5).sqrt());
        assert_eq!(r.points()[1].y, 0.0);

        let c = Histo1D::uniform("/A/c", 3, 0.0, 2.0).unwrap();
        let err = divide("/A/ratio", &a, &c).unwrap_err();
        assert!(matches!(err.root(), Error::EdgeMismatch(_)));
    }

    #[test]
    fn book_from_reference() {
        let mut reference = Scatter2D::new("/REF/ANA/d01-x01-y01").with_title("ref");
        reference.add_point(0.5, 1.0, 0.5, 0.5, 0.1, 0.1).unwrap();
        reference.add_point(1.5, 2.0, 0.5, 0.5, 0.1, 0.1).unwrap();
        reference.add_point(3.0, 2.0, 1.0, 1.0, 0.1, 0.1).unwrap();
        let h = histo_from_reference("/ANA/d01-x01-y01", &reference, DEFAULT_EDGE_TOLERANCE)
            .unwrap();
        assert_eq!(h.axis().edges(), &[0.0, 1.0, 2.0, 4.0]);
        assert_eq!(h.title(), "ref");
        let p = profile_from_reference("/ANA/p", &reference, DEFAULT_EDGE_TOLERANCE).unwrap();
        assert_eq!(p.num_bins(), 3);
    }

    #[test]
    fn integral_summary() {
        let mut h = Histo1D::uniform("/A/h", 2, 0.0, 2.0).unwrap();
        h.fill(0.5, 3.0).unwrap();
        h.fill(1.5, 4.0).unwrap();
        h.fill(9.0, 100.0).unwrap();
        let s = integral_to_scatter("/A/xsec", &h).unwrap();
        assert_eq!(s.points()[0].y, 7.0);
        assert_eq!(s.points()[0].y_err_plus, 5.0);
        assert_eq!(s.points()[0].x, 1.0);
    }
}

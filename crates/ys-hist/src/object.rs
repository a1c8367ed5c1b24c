//! The closed set of analysis object kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ys_core::{Error, Result, ResultExt};

use crate::annotations::Annotations;
use crate::histo1d::Histo1D;
use crate::profile1d::Profile1D;
use crate::scatter2d::Scatter2D;

/// Kind tag of an [`AnalysisObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// [`Histo1D`]
    Histo1D,
    /// [`Profile1D`]
    Profile1D,
    /// [`Scatter2D`]
    Scatter2D,
}

impl ObjectKind {
    /// Type name, as used in annotations and file headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Histo1D => "Histo1D",
            ObjectKind::Profile1D => "Profile1D",
            ObjectKind::Scatter2D => "Scatter2D",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "histo1d" => Ok(ObjectKind::Histo1D),
            "profile1d" => Ok(ObjectKind::Profile1D),
            "scatter2d" => Ok(ObjectKind::Scatter2D),
            _ => Err(Error::UnsupportedType(s.to_string())),
        }
    }
}

/// A histogram, profile or scatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisObject {
    /// Weighted histogram.
    Histo1D(Histo1D),
    /// Profile.
    Profile1D(Profile1D),
    /// Point list.
    Scatter2D(Scatter2D),
}

impl AnalysisObject {
    /// Kind tag.
    pub fn kind(&self) -> ObjectKind {
        match self {
            AnalysisObject::Histo1D(_) => ObjectKind::Histo1D,
            AnalysisObject::Profile1D(_) => ObjectKind::Profile1D,
            AnalysisObject::Scatter2D(_) => ObjectKind::Scatter2D,
        }
    }

    /// Object path.
    pub fn path(&self) -> &str {
        match self {
            AnalysisObject::Histo1D(h) => h.path(),
            AnalysisObject::Profile1D(p) => p.path(),
            AnalysisObject::Scatter2D(s) => s.path(),
        }
    }

    /// Object title.
    pub fn title(&self) -> &str {
        match self {
            AnalysisObject::Histo1D(h) => h.title(),
            AnalysisObject::Profile1D(p) => p.title(),
            AnalysisObject::Scatter2D(s) => s.title(),
        }
    }

    /// Annotations.
    pub fn annotations(&self) -> &Annotations {
        match self {
            AnalysisObject::Histo1D(h) => h.annotations(),
            AnalysisObject::Profile1D(p) => p.annotations(),
            AnalysisObject::Scatter2D(s) => s.annotations(),
        }
    }

    /// Mutable annotations.
    pub fn annotations_mut(&mut self) -> &mut Annotations {
        match self {
            AnalysisObject::Histo1D(h) => h.annotations_mut(),
            AnalysisObject::Profile1D(p) => p.annotations_mut(),
            AnalysisObject::Scatter2D(s) => s.annotations_mut(),
        }
    }

    /// Change the path. Registered objects are re-keyed via
    /// [`Registry::rename`](crate::Registry::rename).
    pub(crate) fn set_path(&mut self, path: impl Into<String>) {
        match self {
            AnalysisObject::Histo1D(h) => h.set_path(path),
            AnalysisObject::Profile1D(p) => p.set_path(path),
            AnalysisObject::Scatter2D(s) => s.set_path(path),
        }
    }

    /// Fail unless `other` can be added to `self` without error.
    pub fn check_compatible(&self, other: &AnalysisObject) -> Result<()> {
        let res = match (self, other) {
            (AnalysisObject::Histo1D(a), AnalysisObject::Histo1D(b)) => {
                a.axis().check_same_binning(b.axis())
            }
            (AnalysisObject::Profile1D(a), AnalysisObject::Profile1D(b)) => {
                a.axis().check_same_binning(b.axis())
            }
            (AnalysisObject::Scatter2D(a), AnalysisObject::Scatter2D(b)) => a.check_same_shape(b),
            (a, b) => Err(Error::ShapeMismatch(format!(
                "cannot combine {} with {}",
                a.kind(),
                b.kind()
            ))),
        };
        res.in_object(self.path(), "add")
    }

    /// Add `other` into `self`. Only objects of the same kind and shape
    /// combine; anything else fails and leaves `self` untouched.
    pub fn add(&mut self, other: &AnalysisObject) -> Result<()> {
        match (self, other) {
            (AnalysisObject::Histo1D(a), AnalysisObject::Histo1D(b)) => a.add(b),
            (AnalysisObject::Profile1D(a), AnalysisObject::Profile1D(b)) => a.add(b),
            (AnalysisObject::Scatter2D(a), AnalysisObject::Scatter2D(b)) => a.add(b),
            (a, b) => Err(Error::ShapeMismatch(format!(
                "cannot combine {} with {}",
                a.kind(),
                b.kind()
            )))
            .in_object(a.path(), "add"),
        }
    }

    /// Multiply weights by `factor`; for scatters, the y values and errors.
    pub fn scale_w(&mut self, factor: f64) -> Result<()> {
        match self {
            AnalysisObject::Histo1D(h) => h.scale_w(factor),
            AnalysisObject::Profile1D(p) => p.scale_w(factor),
            AnalysisObject::Scatter2D(s) => {
                if !factor.is_finite() {
                    return Err(Error::InvalidInput(format!("non-finite scale factor {factor}")))
                        .in_object(s.path(), "scale");
                }
                s.scale_y(factor);
                Ok(())
            }
        }
    }

    /// The histogram, if this is one.
    pub fn as_histo1d(&self) -> Option<&Histo1D> {
        match self {
            AnalysisObject::Histo1D(h) => Some(h),
            _ => None,
        }
    }

    /// The profile, if this is one.
    pub fn as_profile1d(&self) -> Option<&Profile1D> {
        match self {
            AnalysisObject::Profile1D(p) => Some(p),
            _ => None,
        }
    }

    /// The scatter, if this is one.
    pub fn as_scatter2d(&self) -> Option<&Scatter2D> {
        match self {
            AnalysisObject::Scatter2D(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable histogram, or [`Error::ShapeMismatch`] naming the actual kind.
    pub fn histo1d_mut(&mut self) -> Result<&mut Histo1D> {
        match self {
            AnalysisObject::Histo1D(h) => Ok(h),
            other => Err(kind_error(other, ObjectKind::Histo1D)),
        }
    }

    /// Mutable profile, or [`Error::ShapeMismatch`].
    pub fn profile1d_mut(&mut self) -> Result<&mut Profile1D> {
        match self {
            AnalysisObject::Profile1D(p) => Ok(p),
            other => Err(kind_error(other, ObjectKind::Profile1D)),
        }
    }

    /// Mutable scatter, or [`Error::ShapeMismatch`].
    pub fn scatter2d_mut(&mut self) -> Result<&mut Scatter2D> {
        match self {
            AnalysisObject::Scatter2D(s) => Ok(s),
            other => Err(kind_error(other, ObjectKind::Scatter2D)),
        }
    }
}

fn kind_error(obj: &AnalysisObject, wanted: ObjectKind) -> Error {
    Error::Object {
        path: obj.path().to_string(),
        op: "access",
        source: Box::new(Error::ShapeMismatch(format!("expected {wanted}, found {}", obj.kind()))),
    }
}

impl From<Histo1D> for AnalysisObject {
    fn from(h: Histo1D) -> Self {
        AnalysisObject::Histo1D(h)
    }
}

impl From<Profile1D> for AnalysisObject {
    fn from(p: Profile1D) -> Self {
        AnalysisObject::Profile1D(p)
    }
}

impl From<Scatter2D> for AnalysisObject {
    fn from(s: Scatter2D) -> Self {
        AnalysisObject::Scatter2D(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip() {
        for k in [ObjectKind::Histo1D, ObjectKind::Profile1D, ObjectKind::Scatter2D] {
            assert_eq!(k.as_str().parse::<ObjectKind>().unwrap(), k);
        }
        assert!(matches!("Histo2D".parse::<ObjectKind>(), Err(Error::UnsupportedType(_))));
    }

    #[test]
    fn mixed_kinds_do_not_combine() {
        let mut h: AnalysisObject = Histo1D::uniform("/A/h", 2, 0.0, 1.0).unwrap().into();
        let s: AnalysisObject = Scatter2D::new("/A/s").into();
        let before = h.clone();
        let err = h.add(&s).unwrap_err();
        assert!(matches!(err.root(), Error::ShapeMismatch(_)));
        assert!(err.to_string().contains("/A/h"));
        assert!(h.check_compatible(&s).is_err());
        assert_eq!(h, before);
        assert!(h.histo1d_mut().is_ok());
        assert!(h.profile1d_mut().is_err());
    }

    #[test]
    fn same_kind_combines() {
        let mut a = Histo1D::uniform("/A/h", 2, 0.0, 2.0).unwrap();
        a.fill(0.5, 2.0).unwrap();
        let mut oa: AnalysisObject = a.clone().into();
        let ob: AnalysisObject = a.into();
        oa.check_compatible(&ob).unwrap();
        oa.add(&ob).unwrap();
        assert_eq!(oa.as_histo1d().unwrap().integral(false), 4.0);
        oa.scale_w(0.5).unwrap();
        assert_eq!(oa.as_histo1d().unwrap().integral(false), 2.0);
        assert_eq!(oa.kind().to_string(), "Histo1D");
    }
}

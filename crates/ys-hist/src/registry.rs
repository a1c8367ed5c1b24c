//! Path-keyed object store.
//!
//! A [`Registry`] owns every booked object. Paths are always absolute
//! (`/ANALYSIS/name`); there is no notion of a current directory. Consumers
//! that only read can take an [`Arc`] handle, which is a snapshot: later
//! mutation through the registry copies the object first if a handle is
//! still alive.

use std::collections::BTreeMap;
use std::sync::Arc;

use ys_core::{Error, Result};

use crate::histo1d::Histo1D;
use crate::object::AnalysisObject;
use crate::profile1d::Profile1D;
use crate::scatter2d::Scatter2D;

/// Check that `path` is absolute, has no empty segments, no trailing slash
/// and no whitespace.
pub fn validate_path(path: &str) -> Result<()> {
    let ok = path.len() > 1
        && path.starts_with('/')
        && !path.ends_with('/')
        && !path.contains("//")
        && !path.chars().any(char::is_whitespace);
    if ok { Ok(()) } else { Err(Error::InvalidPath(path.to_string())) }
}

/// Directory part of `path` (`"/"` for top-level objects).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

/// Last segment of `path`.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Owning, path-ordered store of analysis objects.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    objects: BTreeMap<String, Arc<AnalysisObject>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under its own path.
    pub fn register(&mut self, object: impl Into<AnalysisObject>) -> Result<()> {
        let object = object.into();
        let path = object.path().to_string();
        validate_path(&path)?;
        if self.objects.contains_key(&path) {
            return Err(Error::DuplicatePath(path));
        }
        log::debug!("registered {} at {}", object.kind(), path);
        self.objects.insert(path, Arc::new(object));
        Ok(())
    }

    /// True if an object lives at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains_key(path)
    }

    /// Object at `path`.
    pub fn find(&self, path: &str) -> Result<&AnalysisObject> {
        self.objects.get(path).map(Arc::as_ref).ok_or_else(|| Error::NotFound(path.to_string()))
    }

    /// Mutable object at `path`. Copies the object first if read handles to
    /// it are still alive.
    pub fn find_mut(&mut self, path: &str) -> Result<&mut AnalysisObject> {
        self.objects.get_mut(path).map(Arc::make_mut).ok_or_else(|| Error::NotFound(path.to_string()))
    }

    /// Shared read handle to the object at `path`.
    pub fn handle(&self, path: &str) -> Result<Arc<AnalysisObject>> {
        self.objects.get(path).cloned().ok_or_else(|| Error::NotFound(path.to_string()))
    }

    /// Mutable histogram at `path`.
    pub fn histo1d_mut(&mut self, path: &str) -> Result<&mut Histo1D> {
        self.find_mut(path)?.histo1d_mut()
    }

    /// Mutable profile at `path`.
    pub fn profile1d_mut(&mut self, path: &str) -> Result<&mut Profile1D> {
        self.find_mut(path)?.profile1d_mut()
    }

    /// Mutable scatter at `path`.
    pub fn scatter2d_mut(&mut self, path: &str) -> Result<&mut Scatter2D> {
        self.find_mut(path)?.scatter2d_mut()
    }

    /// Remove and return the object at `path`.
    pub fn remove(&mut self, path: &str) -> Result<AnalysisObject> {
        let arc = self.objects.remove(path).ok_or_else(|| Error::NotFound(path.to_string()))?;
        Ok(Arc::try_unwrap(arc).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Move the object at `from` to `to`, updating its own path.
    ///
    /// Fails without changes if `to` is invalid or already taken. Handles
    /// taken before the rename keep the old path.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        validate_path(to)?;
        if from != to && self.objects.contains_key(to) {
            return Err(Error::DuplicatePath(to.to_string()));
        }
        let Some(mut arc) = self.objects.remove(from) else {
            return Err(Error::NotFound(from.to_string()));
        };
        Arc::make_mut(&mut arc).set_path(to);
        log::debug!("renamed {from} to {to}");
        self.objects.insert(to.to_string(), arc);
        Ok(())
    }

    /// Paths of objects directly inside directory `dir`.
    pub fn list(&self, dir: &str) -> Vec<&str> {
        let dir = if dir.len() > 1 { dir.trim_end_matches('/') } else { dir };
        self.objects.keys().map(String::as_str).filter(|p| parent_dir(p) == dir).collect()
    }

    /// Immediate subdirectories of `dir`.
    pub fn subdirs(&self, dir: &str) -> Vec<String> {
        let prefix = if dir.ends_with('/') { dir.to_string() } else { format!("{dir}/") };
        let mut out: Vec<String> = self
            .objects
            .keys()
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter_map(|rest| rest.split_once('/').map(|(d, _)| format!("{prefix}{d}")))
            .collect();
        out.dedup();
        out
    }

    /// All objects in path order.
    pub fn iter(&self) -> impl Iterator<Item = &AnalysisObject> {
        self.objects.values().map(Arc::as_ref)
    }

    /// All paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Fold a worker's registry into this one.
    ///
    /// Objects present in both are added together, others are moved over.
    /// Every pair is checked first, so a mismatch anywhere leaves this
    /// registry unchanged.
    pub fn merge(&mut self, other: Registry) -> Result<()> {
        for (path, obj) in &other.objects {
            if let Some(mine) = self.objects.get(path) {
                mine.check_compatible(obj)?;
            }
        }
        for (path, obj) in other.objects {
            match self.objects.get_mut(&path) {
                Some(mine) => Arc::make_mut(mine).add(&obj)?,
                None => {
                    self.objects.insert(path, obj);
                }
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a AnalysisObject;
    type IntoIter = Box<dyn Iterator<Item = &'a AnalysisObject> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histo(path: &str) -> Histo1D {
        Histo1D::uniform(path, 2, 0.0, 2.0).unwrap()
    }

    #[test]
    fn path_rules() {
        assert!(validate_path("/A/h").is_ok());
        assert!(validate_path("A/h").is_err());
        assert!(validate_path("/A/h/").is_err());
        assert!(validate_path("/A//h").is_err());
        assert!(validate_path("/A/my h").is_err());
        assert!(validate_path("/").is_err());
        assert_eq!(parent_dir("/A/B/h"), "/A/B");
        assert_eq!(parent_dir("/h"), "/");
        assert_eq!(basename("/A/B/h"), "h");
    }

    #[test]
    fn register_and_find() {
        let mut r = Registry::new();
        r.register(histo("/ANA/h1")).unwrap();
        r.register(Scatter2D::new("/ANA/sub/s")).unwrap();
        assert!(matches!(r.register(histo("/ANA/h1")), Err(Error::DuplicatePath(_))));
        assert!(matches!(r.register(histo("bad")), Err(Error::InvalidPath(_))));
        assert_eq!(r.len(), 2);
        assert_eq!(r.find("/ANA/h1").unwrap().path(), "/ANA/h1");
        assert!(matches!(r.find("/ANA/nope"), Err(Error::NotFound(_))));
        assert_eq!(r.list("/ANA"), vec!["/ANA/h1"]);
        assert_eq!(r.list("/ANA/"), vec!["/ANA/h1"]);
        assert_eq!(r.subdirs("/ANA"), vec!["/ANA/sub".to_string()]);
        assert!(r.histo1d_mut("/ANA/sub/s").is_err());
    }

    #[test]
    fn handles_are_snapshots() {
        let mut r = Registry::new();
        r.register(histo("/ANA/h")).unwrap();
        let snapshot = r.handle("/ANA/h").unwrap();
        r.histo1d_mut("/ANA/h").unwrap().fill(0.5, 1.0).unwrap();
        assert_eq!(snapshot.as_histo1d().unwrap().integral(false), 0.0);
        assert_eq!(r.find("/ANA/h").unwrap().as_histo1d().unwrap().integral(false), 1.0);
    }

    #[test]
    fn remove_returns_object() {
        let mut r = Registry::new();
        r.register(histo("/ANA/h")).unwrap();
        let _handle = r.handle("/ANA/h").unwrap();
        let obj = r.remove("/ANA/h").unwrap();
        assert_eq!(obj.path(), "/ANA/h");
        assert!(r.is_empty());
        assert!(r.remove("/ANA/h").is_err());
    }

    #[test]
    fn keys_follow_object_paths() {
        let mut r = Registry::new();
        r.register(histo("/A/h1")).unwrap();
        r.register(histo("/A/h2")).unwrap();
        let h2 = r.find_mut("/A/h2").unwrap();
        let err = h2.annotations_mut().set("Path", "/A/h1").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(r.find("/A/h2").unwrap().path(), "/A/h2");

        let before = r.handle("/A/h2").unwrap();
        assert!(matches!(r.rename("/A/h2", "/A/h1"), Err(Error::DuplicatePath(_))));
        assert!(matches!(r.rename("/A/h2", "/A/bad path"), Err(Error::InvalidPath(_))));
        assert!(matches!(r.rename("/A/nope", "/A/h3"), Err(Error::NotFound(_))));
        r.rename("/A/h2", "/B/h3").unwrap();
        r.rename("/B/h3", "/B/h3").unwrap();

        assert!(!r.contains("/A/h2"));
        assert_eq!(r.find("/B/h3").unwrap().path(), "/B/h3");
        assert_eq!(before.path(), "/A/h2");
        for (key, obj) in r.paths().zip(r.iter()) {
            assert_eq!(key, obj.path());
        }
    }

    #[test]
    fn merge_workers() {
        let mut a = Registry::new();
        let mut b = Registry::new();
        let mut h1 = histo("/ANA/h");
        h1.fill(0.5, 1.0).unwrap();
        let mut h2 = histo("/ANA/h");
        h2.fill(1.5, 2.0).unwrap();
        a.register(h1).unwrap();
        b.register(h2).unwrap();
        b.register(Scatter2D::new("/ANA/only_b")).unwrap();
        a.merge(b).unwrap();
        let h = a.find("/ANA/h").unwrap().as_histo1d().unwrap();
        assert_eq!(h.bins()[0].sum_w(), 1.0);
        assert_eq!(h.bins()[1].sum_w(), 2.0);
        assert!(a.contains("/ANA/only_b"));
    }

    #[test]
    fn merge_mismatch_is_atomic() {
        let mut a = Registry::new();
        let mut h = histo("/ANA/a");
        h.fill(0.5, 1.0).unwrap();
        a.register(h.clone()).unwrap();
        a.register(histo("/ANA/z")).unwrap();

        let mut b = Registry::new();
        b.register(h).unwrap();
        b.register(Histo1D::uniform("/ANA/z", 3, 0.0, 2.0).unwrap()).unwrap();
        let err = a.merge(b).unwrap_err();
        assert!(matches!(err.root(), Error::EdgeMismatch(_)));
        let untouched = a.find("/ANA/a").unwrap().as_histo1d().unwrap();
        assert_eq!(untouched.integral(false), 1.0);
    }
}

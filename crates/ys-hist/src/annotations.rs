//! Ordered string key/value metadata attached to every analysis object.

use serde::{Deserialize, Serialize};
use ys_core::{Error, Result};

/// Annotation key holding the object path.
pub const PATH: &str = "Path";

/// Annotation key holding the object title.
pub const TITLE: &str = "Title";

/// Key/value annotations. Lookup is by key; insertion order is kept for
/// serialization, and re-setting a key keeps its original position.
///
/// The `Path` entry is fixed when the object is built. Registered objects
/// change path only through [`Registry::rename`](crate::Registry::rename).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    entries: Vec<(String, String)>,
}

impl Annotations {
    /// Empty annotation set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotations seeded with `Path` and `Title`.
    pub fn with_path(path: impl Into<String>, title: impl Into<String>) -> Self {
        let mut a = Self::new();
        a.insert(PATH, path);
        a.insert(TITLE, title);
        a
    }

    /// Value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// True if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite `key`. Fails with `InvalidInput` for `Path`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if key == PATH {
            return Err(Error::InvalidInput(format!(
                "'{PATH}' cannot be set as an annotation; rename the object instead"
            )));
        }
        self.insert(key, value);
        Ok(())
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove `key`, returning its value. `Path` is never removed.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        if key == PATH {
            return None;
        }
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

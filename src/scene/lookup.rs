//! Layer references
//!
//! Layers are addressed by position (negative counts from the end) or by
//! name (first match wins).

use std::fmt;

/// Index or name of a layer within a scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerRef {
    Index(isize),
    Name(String),
}

impl LayerRef {
    /// Resolve against a scene with `len` layers whose names are `names`.
    pub(crate) fn resolve<'a, I>(&self, len: usize, mut names: I) -> Option<usize>
    where
        I: Iterator<Item = &'a str>,
    {
        match self {
            LayerRef::Index(index) => {
                let len = isize::try_from(len).ok()?;
                let resolved = if *index < 0 { index + len } else { *index };
                if (0..len).contains(&resolved) {
                    usize::try_from(resolved).ok()
                } else {
                    None
                }
            }
            LayerRef::Name(name) => names.position(|n| n == name),
        }
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerRef::Index(index) => write!(f, "index {}", index),
            LayerRef::Name(name) => write!(f, "name '{}'", name),
        }
    }
}

impl From<isize> for LayerRef {
    fn from(index: isize) -> Self {
        LayerRef::Index(index)
    }
}

impl From<i32> for LayerRef {
    fn from(index: i32) -> Self {
        LayerRef::Index(index as isize)
    }
}

impl From<usize> for LayerRef {
    fn from(index: usize) -> Self {
        LayerRef::Index(isize::try_from(index).unwrap_or(isize::MAX))
    }
}

impl From<&str> for LayerRef {
    fn from(name: &str) -> Self {
        LayerRef::Name(name.to_string())
    }
}

impl From<String> for LayerRef {
    fn from(name: String) -> Self {
        LayerRef::Name(name)
    }
}

impl From<&String> for LayerRef {
    fn from(name: &String) -> Self {
        LayerRef::Name(name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(which: impl Into<LayerRef>) -> Option<usize> {
        let names = ["a", "b", "a"];
        which.into().resolve(names.len(), names.iter().copied())
    }

    #[test]
    fn test_positive_and_negative_indices() {
        assert_eq!(resolve(0), Some(0));
        assert_eq!(resolve(2), Some(2));
        assert_eq!(resolve(-1), Some(2));
        assert_eq!(resolve(-3), Some(0));
        assert_eq!(resolve(3), None);
        assert_eq!(resolve(-4), None);
    }

    #[test]
    fn test_name_first_match() {
        assert_eq!(resolve("a"), Some(0));
        assert_eq!(resolve("b"), Some(1));
        assert_eq!(resolve("c"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(LayerRef::from(-1).to_string(), "index -1");
        assert_eq!(LayerRef::from("seg").to_string(), "name 'seg'");
    }
}

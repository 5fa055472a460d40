use derive_more::{Display, From};
use thiserror::Error;

use crate::node::NodePath;

use super::StoreKey;

/// A Zarr abstract store prefix.
///
/// A prefix is empty or a string of one or more `/` separated segments ending
/// with `/` and not beginning with `/`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StorePrefix(String);

/// An invalid store prefix.
#[derive(Clone, Debug, From, Error)]
#[error("invalid store prefix {_0}")]
pub struct StorePrefixError(String);

/// A list of [`StorePrefix`].
pub type StorePrefixes = Vec<StorePrefix>;

impl StorePrefix {
    /// The root prefix.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Create a new store prefix from `prefix`.
    ///
    /// # Errors
    /// Returns [`StorePrefixError`] if `prefix` is not valid according to
    /// [`StorePrefix::validate`].
    pub fn new(prefix: impl Into<String>) -> Result<Self, StorePrefixError> {
        let prefix = prefix.into();
        if Self::validate(&prefix) {
            Ok(Self(prefix))
        } else {
            Err(StorePrefixError(prefix))
        }
    }

    /// Create a new store prefix from `prefix` without validation.
    ///
    /// # Safety
    /// `prefix` is not validated, so this can result in an invalid store prefix.
    #[must_use]
    pub unsafe fn new_unchecked(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        debug_assert!(Self::validate(&prefix));
        Self(prefix)
    }

    /// Extracts a string slice of the underlying prefix.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a prefix.
    #[must_use]
    pub fn validate(prefix: &str) -> bool {
        prefix.is_empty() || (prefix.ends_with('/') && !prefix.starts_with('/'))
    }

    /// Returns the name of the prefix: its last `/` separated segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0
            .strip_suffix('/')
            .unwrap_or(&self.0)
            .split('/')
            .next_back()
            .unwrap_or("")
    }

    /// Returns the parent of this prefix, or [`None`] for the root prefix.
    #[must_use]
    pub fn parent(&self) -> Option<StorePrefix> {
        let without_trailing = self.0.strip_suffix('/')?;
        let split: Vec<_> = without_trailing.split('/').collect();
        let mut parent = split[..split.len() - 1].join("/");
        if !parent.is_empty() {
            parent.push('/');
        }
        Some(unsafe { Self::new_unchecked(parent) })
    }

    /// Return the prefix of a child named `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        unsafe { Self::new_unchecked(format!("{}{name}/", self.0)) }
    }
}

impl TryFrom<&str> for StorePrefix {
    type Error = StorePrefixError;

    fn try_from(prefix: &str) -> Result<Self, Self::Error> {
        Self::new(prefix)
    }
}

impl From<&NodePath> for StorePrefix {
    fn from(path: &NodePath) -> Self {
        let path = path.as_str();
        if path == "/" {
            Self::root()
        } else {
            let path = path.strip_prefix('/').unwrap_or(path);
            unsafe { Self::new_unchecked(format!("{path}/")) }
        }
    }
}

impl From<&StoreKey> for StorePrefix {
    fn from(key: &StoreKey) -> Self {
        unsafe { Self::new_unchecked(format!("{}/", key.as_str())) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_prefix_validation() {
        assert!(StorePrefix::new("").is_ok());
        assert!(StorePrefix::new("a/").is_ok());
        assert!(StorePrefix::new("a/b/").is_ok());
        assert!(StorePrefix::new("a").is_err());
        assert!(StorePrefix::new("/a/").is_err());
    }

    #[test]
    fn store_prefix_name_and_parent() {
        let prefix = StorePrefix::new("a/b/").unwrap();
        assert_eq!(prefix.name(), "b");
        assert_eq!(prefix.parent(), Some(StorePrefix::new("a/").unwrap()));
        assert_eq!(
            StorePrefix::new("a/").unwrap().parent(),
            Some(StorePrefix::root())
        );
        assert_eq!(StorePrefix::root().parent(), None);
        assert_eq!(StorePrefix::root().child("grp"), StorePrefix::new("grp/").unwrap());
    }

    #[test]
    fn store_prefix_from_node_path() {
        assert_eq!(
            StorePrefix::from(&NodePath::new("/").unwrap()),
            StorePrefix::root()
        );
        assert_eq!(
            StorePrefix::from(&NodePath::new("/a/b").unwrap()),
            StorePrefix::new("a/b/").unwrap()
        );
    }
}

use thiserror::Error;

/// A Zarr hierarchy node name.
///
/// A valid node name is non-empty, is not composed entirely of periods, does
/// not start with the reserved prefix `__`, and contains only Unicode
/// letters, marks, and digits plus `.`, `_`, and `-`. The root node has the
/// empty name.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NodeName(String);

/// An invalid node name.
#[derive(Clone, Debug, Error)]
#[error("invalid node name {_0}")]
pub struct NodeNameError(String);

impl NodeName {
    /// Create a new node name from `name`.
    ///
    /// # Errors
    /// Returns [`NodeNameError`] if `name` is not valid according to
    /// [`NodeName::validate`].
    pub fn new(name: &str) -> Result<Self, NodeNameError> {
        if Self::validate(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(NodeNameError(name.to_string()))
        }
    }

    /// The root node name (the empty string).
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Extracts a string slice of the node name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Indicates if this is the root node name.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Validates a node name.
    #[must_use]
    pub fn validate(name: &str) -> bool {
        !name.is_empty()
            && !name.starts_with("__")
            && !name.chars().all(|c| c == '.')
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }
}

impl core::fmt::Display for NodeName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_name_valid() {
        assert!(NodeName::new("a").is_ok());
        assert!(NodeName::new("array-1.0_b").is_ok());
        assert!(NodeName::new("µs").is_ok());
        assert!(NodeName::new("Đà_Lạt").is_ok());
        assert!(NodeName::new("東京").is_ok());
    }

    #[test]
    fn node_name_invalid() {
        assert!(NodeName::new("").is_err());
        assert!(NodeName::new(".").is_err());
        assert!(NodeName::new("..").is_err());
        assert!(NodeName::new("...").is_err());
        assert!(NodeName::new("__reserved").is_err());
        assert!(NodeName::new("a/b").is_err());
        assert!(NodeName::new("a b").is_err());
    }

    #[test]
    fn node_name_root() {
        assert!(NodeName::root().is_root());
        assert_eq!(NodeName::root().as_str(), "");
    }
}

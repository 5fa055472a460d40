use thiserror::Error;

use super::NodeName;

/// A Zarr hierarchy node path.
///
/// The root path is `/`; all other paths are `/` followed by `/` separated
/// valid node names, with no trailing `/`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Clone, Debug, Error)]
#[error("invalid node path {_0}")]
pub struct NodePathError(String);

impl NodePath {
    /// The root node path (`/`).
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Create a new node path from `path`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `path` is not valid according to
    /// [`NodePath::validate`].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// Extracts a string slice of the node path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a node path.
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path == "/"
            || (path.starts_with('/')
                && !path.ends_with('/')
                && path[1..].split('/').all(NodeName::validate))
    }

    /// Indicates if this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Return the name of the node: the final path segment, empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.is_root() {
            ""
        } else {
            self.0.rsplit('/').next().unwrap_or("")
        }
    }

    /// Return the parent path, or [`None`] for the root path.
    #[must_use]
    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            None
        } else {
            let parent = &self.0[..self.0.rfind('/').unwrap_or(0)];
            Some(if parent.is_empty() {
                Self::root()
            } else {
                Self(parent.to_string())
            })
        }
    }

    /// Return the path of a child named `name`.
    #[must_use]
    pub fn child(&self, name: &NodeName) -> NodePath {
        if self.is_root() {
            Self(format!("/{name}", name = name.as_str()))
        } else {
            Self(format!("{}/{}", self.0, name.as_str()))
        }
    }

    /// Resolve a relative path against this path.
    ///
    /// `.` and empty segments are ignored and `..` pops a segment. Returns
    /// [`None`] if a `..` escapes above the root. A `relative` beginning with
    /// `/` is resolved as an absolute path.
    #[must_use]
    pub fn resolve(&self, relative: &str) -> Option<NodePath> {
        if relative.starts_with('/') {
            return Self::new(relative).ok();
        }
        let mut segments: Vec<&str> = if self.is_root() {
            Vec::new()
        } else {
            self.0[1..].split('/').collect()
        };
        for segment in relative.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop()?;
                }
                name => {
                    if !NodeName::validate(name) {
                        return None;
                    }
                    segments.push(name);
                }
            }
        }
        if segments.is_empty() {
            Some(Self::root())
        } else {
            Some(Self(format!("/{}", segments.join("/"))))
        }
    }
}

impl core::fmt::Display for NodePath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

//! Zarr hierarchy nodes.
//!
//! A node is either a [`Group`] or an [`Array`]. Node locations are described
//! by a [`NodePath`] of `/` separated [`NodeName`]s; the root node has the
//! path `/` and the empty name.

mod node_name;
mod node_path;

pub use node_name::{NodeName, NodeNameError};
pub use node_path::{NodePath, NodePathError};

use crate::{array::Array, group::Group, metadata::NodeMetadata};

/// A Zarr hierarchy node: a group or an array.
#[derive(Debug)]
pub enum Node {
    /// A group node.
    Group(Group),
    /// An array node.
    Array(Array),
}

impl Node {
    /// Return the path of the node.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        match self {
            Self::Group(group) => group.path(),
            Self::Array(array) => array.path(),
        }
    }

    /// Return the name of the node.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path().name()
    }

    /// Return true if the node is a group.
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Return true if the node is an array.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Return the node as a group, if it is one.
    #[must_use]
    pub const fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Array(_) => None,
        }
    }

    /// Return the node as a mutable group, if it is one.
    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Array(_) => None,
        }
    }

    /// Return the node as an array, if it is one.
    #[must_use]
    pub const fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Group(_) => None,
            Self::Array(array) => Some(array),
        }
    }

    /// Return the node as a mutable array, if it is one.
    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Self::Group(_) => None,
            Self::Array(array) => Some(array),
        }
    }

    /// Return the metadata document of the node.
    #[must_use]
    pub fn metadata(&self) -> NodeMetadata {
        match self {
            Self::Group(group) => NodeMetadata::Group(group.metadata()),
            Self::Array(array) => NodeMetadata::Array(array.metadata()),
        }
    }
}

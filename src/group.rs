//! Zarr groups.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    metadata::{GroupMetadataV3, NodeMetadata},
    node::{Node, NodePath},
    storage::{node_metadata, set_node_metadata, Storage, StorageError},
};

/// A Zarr group: an interior hierarchy node holding child groups and arrays.
#[derive(Debug)]
pub struct Group {
    storage: Storage,
    path: NodePath,
    attributes: serde_json::Map<String, serde_json::Value>,
    additional_fields: serde_json::Map<String, serde_json::Value>,
    attributes_dirty: bool,
    children: BTreeMap<String, Node>,
}

/// A group creation error.
#[derive(Debug, Error)]
pub enum GroupCreateError {
    /// No group metadata document exists at the node.
    #[error("group metadata is missing at {_0}")]
    MissingMetadata(NodePath),
    /// The node is an array, not a group.
    #[error("the node at {_0} is an array, not a group")]
    NodeIsAnArray(NodePath),
    /// The metadata is invalid.
    #[error("group metadata is invalid: {_0}")]
    InvalidMetadata(String),
    /// A storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Group {
    /// Create a group from its metadata document.
    ///
    /// The metadata is not (re)written to the store and no children are
    /// discovered.
    ///
    /// # Errors
    /// Returns a [`GroupCreateError`] if the metadata is invalid.
    pub fn new_with_metadata(
        storage: Storage,
        path: &NodePath,
        metadata: GroupMetadataV3,
    ) -> Result<Self, GroupCreateError> {
        if !metadata.validate_format() || !metadata.validate_node_type() {
            return Err(GroupCreateError::InvalidMetadata(
                "unsupported zarr_format or node_type".to_string(),
            ));
        }
        Ok(Self {
            storage,
            path: path.clone(),
            attributes: metadata.attributes,
            additional_fields: metadata.additional_fields,
            attributes_dirty: false,
            children: BTreeMap::new(),
        })
    }

    /// Open the group at `path` by reading its metadata from the store.
    ///
    /// # Errors
    /// Returns a [`GroupCreateError`] if the metadata is missing, is not
    /// group metadata, or is invalid.
    pub fn open(storage: Storage, path: &NodePath) -> Result<Self, GroupCreateError> {
        match node_metadata(&*storage, path)? {
            Some(NodeMetadata::Group(metadata)) => Self::new_with_metadata(storage, path, metadata),
            Some(NodeMetadata::Array(_)) => Err(GroupCreateError::NodeIsAnArray(path.clone())),
            None => Err(GroupCreateError::MissingMetadata(path.clone())),
        }
    }

    /// Return the path of the group.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        &self.path
    }

    /// Create the metadata document of the group.
    #[must_use]
    pub fn metadata(&self) -> GroupMetadataV3 {
        let mut metadata = GroupMetadataV3::new(self.attributes.clone());
        metadata.additional_fields = self.additional_fields.clone();
        metadata
    }

    /// Return the user attributes of the group.
    #[must_use]
    pub const fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }

    /// Set the attribute `name` to `value`.
    ///
    /// The change is persisted on [`save`](Group::save).
    pub fn set_attribute(&mut self, name: &str, value: serde_json::Value) {
        self.attributes.insert(name.to_string(), value);
        self.attributes_dirty = true;
    }

    /// Delete the attribute `name`, returning true if it existed.
    pub fn delete_attribute(&mut self, name: &str) -> bool {
        let deleted = self.attributes.remove(name).is_some();
        self.attributes_dirty |= deleted;
        deleted
    }

    /// Delete all attributes.
    pub fn delete_attributes(&mut self) {
        if !self.attributes.is_empty() {
            self.attributes.clear();
            self.attributes_dirty = true;
        }
    }

    /// Return true if the group attributes have unpersisted changes.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.attributes_dirty
    }

    /// Persist the metadata document if attributes changed.
    ///
    /// # Errors
    /// Returns a [`StorageError`] on a backend failure.
    pub fn save(&mut self) -> Result<(), StorageError> {
        if self.attributes_dirty {
            set_node_metadata(
                &*self.storage,
                &self.path,
                &NodeMetadata::Group(self.metadata()),
            )?;
            self.attributes_dirty = false;
        }
        Ok(())
    }

    /// Return the ordered mapping from child name to child node.
    #[must_use]
    pub const fn children(&self) -> &BTreeMap<String, Node> {
        &self.children
    }

    /// Return the child named `name`, if any.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// Return the mutable child named `name`, if any.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.get_mut(name)
    }

    /// Return the paths of the child arrays of this group.
    #[must_use]
    pub fn array_paths(&self) -> Vec<String> {
        self.children
            .values()
            .filter(|node| node.is_array())
            .map(|node| node.path().to_string())
            .collect()
    }

    /// Return the paths of the child groups of this group.
    #[must_use]
    pub fn group_paths(&self) -> Vec<String> {
        self.children
            .values()
            .filter(|node| node.is_group())
            .map(|node| node.path().to_string())
            .collect()
    }

    pub(crate) fn insert_child(&mut self, name: String, node: Node) {
        self.children.insert(name, node);
    }

    pub(crate) fn remove_child(&mut self, name: &str) -> Option<Node> {
        self.children.remove(name)
    }

    pub(crate) fn clear_children(&mut self) {
        self.children.clear();
    }
}

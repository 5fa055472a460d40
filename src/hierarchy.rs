//! The dataset root.
//!
//! A [`Dataset`] pairs a store with the in-memory tree of nodes materialized
//! from it. Opening a dataset reads the root metadata document and, for a
//! group root, recursively discovers children by listing the store (or from
//! V2 consolidated metadata when the store cannot list). All hierarchy
//! mutations go through the dataset, which keeps the store and the tree in
//! step: child metadata is committed to the store before the parent's child
//! mapping is updated.

use thiserror::Error;

use crate::{
    array::{
        Array, ArrayCreateError, ArrayError, ArrayMetadataBuilder, ArrayMetadataBuilderError,
    },
    group::{Group, GroupCreateError},
    metadata::{ArrayMetadataV3, NodeMetadata},
    node::{Node, NodeName, NodeNameError, NodePath, NodePathError},
    storage::{
        consolidated_node_paths, create_array, create_group, erase_node, erase_node_children,
        node_metadata, Storage, StorageError, StorePrefix,
    },
};

/// A Zarr dataset: a store and the hierarchy materialized from it.
#[derive(Debug)]
pub struct Dataset {
    storage: Storage,
    root: Node,
}

/// A dataset error.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An array could not be created.
    #[error(transparent)]
    ArrayCreate(#[from] ArrayCreateError),
    /// A group could not be created.
    #[error(transparent)]
    GroupCreate(#[from] GroupCreateError),
    /// An array operation failed.
    #[error(transparent)]
    Array(#[from] ArrayError),
    /// An array metadata builder error.
    #[error(transparent)]
    Builder(#[from] ArrayMetadataBuilderError),
    /// An invalid node name.
    #[error(transparent)]
    InvalidName(#[from] NodeNameError),
    /// An invalid node path.
    #[error(transparent)]
    InvalidPath(#[from] NodePathError),
    /// The store has no root metadata document.
    #[error("the store has no root metadata document")]
    MissingRootMetadata,
    /// A node with the same name already exists.
    #[error("node {_0} already exists")]
    DuplicateName(NodePath),
    /// The node does not exist.
    #[error("node {_0} not found")]
    NodeNotFound(String),
    /// The node is not a group.
    #[error("node {_0} is not a group")]
    NotAGroup(String),
    /// The group is not empty.
    #[error("group {_0} is not empty")]
    GroupNotEmpty(NodePath),
    /// The store does not support deletes.
    #[error("the store does not support deletes")]
    DeletesUnsupported,
}

fn materialize_node(
    storage: &Storage,
    path: &NodePath,
    metadata: NodeMetadata,
) -> Result<Node, DatasetError> {
    match metadata {
        NodeMetadata::Array(metadata) => Ok(Node::Array(Array::new_with_metadata(
            storage.clone(),
            path,
            metadata,
        )?)),
        NodeMetadata::Group(metadata) => {
            let mut group = Group::new_with_metadata(storage.clone(), path, metadata)?;
            for child_path in discover_child_paths(storage, path)? {
                // children without a recognized metadata document are skipped
                let Some(child_metadata) = node_metadata(&**storage, &child_path)? else {
                    continue;
                };
                let child = materialize_node(storage, &child_path, child_metadata)?;
                group.insert_child(child_path.name().to_string(), child);
            }
            Ok(Node::Group(group))
        }
    }
}

fn discover_child_paths(
    storage: &Storage,
    path: &NodePath,
) -> Result<Vec<NodePath>, DatasetError> {
    if storage.supports_listing() {
        let listing = storage.list_dir(&StorePrefix::from(path))?;
        Ok(listing
            .prefixes()
            .iter()
            .filter_map(|child| NodeName::new(child.name()).ok().map(|name| path.child(&name)))
            .collect())
    } else if let Some(consolidated) = storage.consolidated_metadata()? {
        Ok(consolidated_node_paths(&consolidated)
            .into_iter()
            .filter(|candidate| candidate.parent().as_ref() == Some(path))
            .collect())
    } else {
        Ok(vec![])
    }
}

fn discard_node(node: &Node) {
    match node {
        Node::Array(array) => array.discard_chunks(),
        Node::Group(group) => {
            for child in group.children().values() {
                discard_node(child);
            }
        }
    }
}

impl Dataset {
    /// Open the dataset rooted at the store.
    ///
    /// The root metadata document must exist. An array root yields a
    /// single-array dataset; a group root triggers recursive hierarchy
    /// materialization.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the root metadata is absent or any
    /// discovered metadata document is invalid.
    pub fn open(storage: Storage) -> Result<Self, DatasetError> {
        let root_path = NodePath::root();
        let metadata =
            node_metadata(&*storage, &root_path)?.ok_or(DatasetError::MissingRootMetadata)?;
        let root = materialize_node(&storage, &root_path, metadata)?;
        Ok(Self { storage, root })
    }

    /// Create a dataset with an empty root group, committing its metadata.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] on a storage failure.
    pub fn create_with_root_group(storage: Storage) -> Result<Self, DatasetError> {
        let root_path = NodePath::root();
        let metadata = create_group(&*storage, &root_path)?;
        let root = Node::Group(Group::new_with_metadata(
            storage.clone(),
            &root_path,
            metadata,
        )?);
        Ok(Self { storage, root })
    }

    /// Create a single-array dataset, committing the array metadata at the
    /// store root.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the metadata is invalid or the store
    /// fails.
    pub fn create_with_root_array(
        storage: Storage,
        metadata: ArrayMetadataV3,
    ) -> Result<Self, DatasetError> {
        let root_path = NodePath::root();
        create_array(&*storage, &root_path, &metadata)?;
        let root = Node::Array(Array::new_with_metadata(
            storage.clone(),
            &root_path,
            metadata,
        )?);
        Ok(Self { storage, root })
    }

    /// Return the store of the dataset.
    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Return the root node.
    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    /// Return the node at an absolute `path`, if any.
    ///
    /// Resolution does not traverse into arrays.
    #[must_use]
    pub fn node(&self, path: &str) -> Option<&Node> {
        self.node_at(&NodePath::new(path).ok()?)
    }

    /// Return the node at `path`, if any.
    #[must_use]
    pub fn node_at(&self, path: &NodePath) -> Option<&Node> {
        let mut node = &self.root;
        if path.is_root() {
            return Some(node);
        }
        for name in path.as_str()[1..].split('/') {
            node = node.as_group()?.child(name)?;
        }
        Some(node)
    }

    fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut node = &mut self.root;
        if path.is_root() {
            return Some(node);
        }
        for name in path.as_str()[1..].split('/') {
            node = node.as_group_mut()?.child_mut(name)?;
        }
        Some(node)
    }

    /// Return the group at an absolute `path`, if any.
    #[must_use]
    pub fn group(&self, path: &str) -> Option<&Group> {
        self.node(path)?.as_group()
    }

    /// Return the array at an absolute `path`, if any.
    #[must_use]
    pub fn array(&self, path: &str) -> Option<&Array> {
        self.node(path)?.as_array()
    }

    /// Return the mutable array at an absolute `path`, if any.
    pub fn array_mut(&mut self, path: &str) -> Option<&mut Array> {
        self.node_at_mut(&NodePath::new(path).ok()?)?.as_array_mut()
    }

    /// Return the mutable group at an absolute `path`, if any.
    pub fn group_mut(&mut self, path: &str) -> Option<&mut Group> {
        self.node_at_mut(&NodePath::new(path).ok()?)?.as_group_mut()
    }

    /// Resolve a path relative to `base` and return the node there, if any.
    ///
    /// Supports `.` and `..` segments; `..` above the root resolves to
    /// nothing.
    #[must_use]
    pub fn resolve_from(&self, base: &NodePath, relative: &str) -> Option<&Node> {
        self.node_at(&base.resolve(relative)?)
    }

    /// Return the paths of all groups in the dataset, the root included.
    #[must_use]
    pub fn group_paths(&self) -> Vec<String> {
        let mut groups = Vec::new();
        let mut arrays = Vec::new();
        visit(&self.root, &mut groups, &mut arrays);
        groups.sort();
        groups
    }

    /// Return the paths of all arrays in the dataset.
    #[must_use]
    pub fn array_paths(&self) -> Vec<String> {
        let mut groups = Vec::new();
        let mut arrays = Vec::new();
        visit(&self.root, &mut groups, &mut arrays);
        arrays.sort();
        arrays
    }

    fn check_addition(
        &self,
        parent_path: &NodePath,
        name: &NodeName,
    ) -> Result<NodePath, DatasetError> {
        let parent = self
            .node_at(parent_path)
            .ok_or_else(|| DatasetError::NodeNotFound(parent_path.to_string()))?;
        let parent = parent
            .as_group()
            .ok_or_else(|| DatasetError::NotAGroup(parent_path.to_string()))?;
        let child_path = parent_path.child(name);
        if parent.child(name.as_str()).is_some() {
            return Err(DatasetError::DuplicateName(child_path));
        }
        Ok(child_path)
    }

    /// Add a group named `name` under the group at `parent_path`.
    ///
    /// The group metadata is committed to the store before the parent's child
    /// mapping is updated.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the name is invalid, the parent is
    /// missing or not a group, the name is taken, or the store fails.
    pub fn add_group(&mut self, parent_path: &str, name: &str) -> Result<&Group, DatasetError> {
        let name = NodeName::new(name)?;
        let parent_path = NodePath::new(parent_path)?;
        let child_path = self.check_addition(&parent_path, &name)?;

        let metadata = create_group(&*self.storage, &child_path)?;
        let child = Group::new_with_metadata(self.storage.clone(), &child_path, metadata)?;

        let parent = self
            .node_at_mut(&parent_path)
            .and_then(Node::as_group_mut)
            .ok_or_else(|| DatasetError::NodeNotFound(parent_path.to_string()))?;
        parent.insert_child(name.as_str().to_string(), Node::Group(child));
        parent
            .child(name.as_str())
            .and_then(Node::as_group)
            .ok_or(DatasetError::DuplicateName(child_path))
    }

    /// Add an array named `name` under the group at `parent_path`.
    ///
    /// The chunk key separator defaults to the store's separator unless the
    /// builder sets a chunk key encoding explicitly. The array metadata is
    /// committed to the store before the parent's child mapping is updated.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the name is invalid, the parent is
    /// missing or not a group, the name is taken, the builder is incomplete,
    /// or the store fails.
    pub fn add_array(
        &mut self,
        parent_path: &str,
        name: &str,
        builder: &ArrayMetadataBuilder,
    ) -> Result<&Array, DatasetError> {
        let name = NodeName::new(name)?;
        let parent_path = NodePath::new(parent_path)?;
        let child_path = self.check_addition(&parent_path, &name)?;

        let metadata = builder.metadata_with_separator(self.storage.separator())?;
        create_array(&*self.storage, &child_path, &metadata)?;
        let child = Array::new_with_metadata(self.storage.clone(), &child_path, metadata)?;

        let parent = self
            .node_at_mut(&parent_path)
            .and_then(Node::as_group_mut)
            .ok_or_else(|| DatasetError::NodeNotFound(parent_path.to_string()))?;
        parent.insert_child(name.as_str().to_string(), Node::Array(child));
        parent
            .child(name.as_str())
            .and_then(Node::as_array)
            .ok_or(DatasetError::DuplicateName(child_path))
    }

    fn check_deletes_supported(&self) -> Result<(), DatasetError> {
        if self.storage.supports_deletes() {
            Ok(())
        } else {
            Err(DatasetError::DeletesUnsupported)
        }
    }

    /// Delete the node at `path`.
    ///
    /// A group must be empty; use [`delete_group`](Dataset::delete_group)
    /// with `recursive` for non-empty groups. Deleting a root array leaves a
    /// dataset with an empty root group.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the node is missing, is a non-empty
    /// group, or the store fails.
    pub fn delete(&mut self, path: &str) -> Result<(), DatasetError> {
        self.check_deletes_supported()?;
        let path = NodePath::new(path)?;
        if path.is_root() {
            if self.root.is_array() {
                discard_node(&self.root);
                erase_node(&*self.storage, &path)?;
                let metadata = create_group(&*self.storage, &path)?;
                self.root = Node::Group(Group::new_with_metadata(
                    self.storage.clone(),
                    &path,
                    metadata,
                )?);
                return Ok(());
            }
            // the root group itself always survives
            let empty = self
                .root
                .as_group()
                .is_some_and(|group| group.children().is_empty());
            return if empty {
                Ok(())
            } else {
                Err(DatasetError::GroupNotEmpty(path))
            };
        }

        let node = self
            .node_at(&path)
            .ok_or_else(|| DatasetError::NodeNotFound(path.to_string()))?;
        if let Some(group) = node.as_group() {
            if !group.children().is_empty() {
                return Err(DatasetError::GroupNotEmpty(path));
            }
        }
        discard_node(node);
        erase_node(&*self.storage, &path)?;
        if let Some(parent_path) = path.parent() {
            if let Some(parent) = self.node_at_mut(&parent_path).and_then(Node::as_group_mut) {
                parent.remove_child(path.name());
            }
        }
        Ok(())
    }

    /// Delete the group at `path`.
    ///
    /// With `recursive`, all descendants are deleted; the root group itself
    /// always survives as an empty group.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the node is missing, is not a group, is
    /// non-empty without `recursive`, or the store fails.
    pub fn delete_group(&mut self, path: &str, recursive: bool) -> Result<(), DatasetError> {
        self.check_deletes_supported()?;
        let path = NodePath::new(path)?;
        {
            let node = self
                .node_at(&path)
                .ok_or_else(|| DatasetError::NodeNotFound(path.to_string()))?;
            let group = node
                .as_group()
                .ok_or_else(|| DatasetError::NotAGroup(path.to_string()))?;
            if !recursive && !group.children().is_empty() {
                return Err(DatasetError::GroupNotEmpty(path));
            }
            discard_node(node);
        }
        if path.is_root() {
            let metadata = erase_node_children(&*self.storage, &path)?;
            self.root = Node::Group(Group::new_with_metadata(
                self.storage.clone(),
                &path,
                metadata,
            )?);
        } else {
            erase_node(&*self.storage, &path)?;
            if let Some(parent_path) = path.parent() {
                if let Some(parent) = self.node_at_mut(&parent_path).and_then(Node::as_group_mut) {
                    parent.remove_child(path.name());
                }
            }
        }
        Ok(())
    }

    /// Erase all descendants of the node at `path`, preserving the node
    /// itself as an empty group with minimal metadata.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the node is missing or the store fails.
    pub fn delete_all(&mut self, path: &str) -> Result<(), DatasetError> {
        self.check_deletes_supported()?;
        let path = NodePath::new(path)?;
        {
            let node = self
                .node_at(&path)
                .ok_or_else(|| DatasetError::NodeNotFound(path.to_string()))?;
            discard_node(node);
        }
        let metadata = erase_node_children(&*self.storage, &path)?;
        let group = Group::new_with_metadata(self.storage.clone(), &path, metadata)?;
        if path.is_root() {
            self.root = Node::Group(group);
        } else if let Some(node) = self.node_at_mut(&path) {
            *node = Node::Group(group);
        }
        Ok(())
    }

    /// Persist all dirty attributes and flush all arrays.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] on a storage or codec failure.
    pub fn save(&mut self) -> Result<(), DatasetError> {
        save_node(&mut self.root)
    }
}

fn visit(node: &Node, groups: &mut Vec<String>, arrays: &mut Vec<String>) {
    match node {
        Node::Array(array) => arrays.push(array.path().to_string()),
        Node::Group(group) => {
            groups.push(group.path().to_string());
            for child in group.children().values() {
                visit(child, groups, arrays);
            }
        }
    }
}

fn save_node(node: &mut Node) -> Result<(), DatasetError> {
    match node {
        Node::Array(array) => array.save()?,
        Node::Group(group) => {
            group.save()?;
            let names: Vec<String> = group.children().keys().cloned().collect();
            for name in names {
                if let Some(child) = group.child_mut(&name) {
                    save_node(child)?;
                }
            }
        }
    }
    Ok(())
}

//! Builds a rooted hierarchy from the flat repository listing.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::contract::{EntryKind, TreeEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Leaf,
}

impl From<EntryKind> for NodeKind {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Text => NodeKind::Leaf,
            EntryKind::Directory => NodeKind::Directory,
        }
    }
}

/// A node of the repository tree. The root has an empty `path` and the repository
/// name as `name`; every other node's `path` is its parent's path joined with `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub path: String,
    pub kind: NodeKind,
    /// Keyed by child name. Always empty for leaves.
    pub children: BTreeMap<String, TreeNode>,
}

/// Structural contract violations in a listing or a hand-built tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("invalid entry path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("node {path:?} does not match its position in the tree: {reason}")]
    Malformed { path: String, reason: &'static str },
}

impl TreeNode {
    pub fn root(name: impl Into<String>) -> Self {
        Self::new(name, String::new(), NodeKind::Directory)
    }

    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
            children: BTreeMap::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Look up a descendant by its `/`-separated path relative to this node.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        path.split('/')
            .try_fold(self, |node, segment| node.children.get(segment))
    }

    /// Paths of every leaf below this node, in name order.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_leaf_paths(&mut out);
        out
    }

    fn collect_leaf_paths(&self, out: &mut Vec<String>) {
        for child in self.children.values() {
            match child.kind {
                NodeKind::Leaf => out.push(child.path.clone()),
                NodeKind::Directory => child.collect_leaf_paths(out),
            }
        }
    }
}

/// Convert a flat listing into a tree rooted at `root_name`.
///
/// Entries are processed in path order. The terminal segment of each entry takes the
/// entry's declared kind, intermediate segments are directories. A leaf that turns
/// out to be the ancestor of a longer path is promoted to a directory in place; the
/// reverse never happens.
pub fn build_tree(entries: &[TreeEntry], root_name: &str) -> Result<TreeNode, TreeError> {
    let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut root = TreeNode::root(root_name);

    for entry in sorted {
        let segments = split_path(&entry.path)?;
        let last = segments.len() - 1;
        let mut current = &mut root;

        for (index, segment) in segments.iter().enumerate() {
            let is_terminal = index == last;
            let child_path = if current.path.is_empty() {
                (*segment).to_string()
            } else {
                format!("{}/{}", current.path, segment)
            };
            let kind = if is_terminal {
                NodeKind::from(entry.kind)
            } else {
                NodeKind::Directory
            };

            let child = current
                .children
                .entry((*segment).to_string())
                .or_insert_with(|| TreeNode::new(*segment, child_path, kind));

            if !is_terminal && child.kind == NodeKind::Leaf {
                warn!(
                    path = %child.path,
                    via = %entry.path,
                    "Path conflict: leaf is part of a longer path, promoting it to a directory"
                );
                child.kind = NodeKind::Directory;
                child.children.clear();
            }
            current = child;
        }
    }

    debug!(
        root = root_name,
        entries = entries.len(),
        top_level = root.children.len(),
        "Built repository tree"
    );
    Ok(root)
}

fn split_path(path: &str) -> Result<Vec<&str>, TreeError> {
    if path.is_empty() {
        return Err(TreeError::InvalidPath {
            path: path.to_string(),
            reason: "path is empty",
        });
    }
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments {
        let reason = match *segment {
            "" => "empty segment",
            "." | ".." => "relative segment",
            _ => continue,
        };
        return Err(TreeError::InvalidPath {
            path: path.to_string(),
            reason,
        });
    }
    Ok(segments)
}

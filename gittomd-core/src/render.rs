//! Plain-text box-drawing rendering of a [`TreeNode`].
//!
//! The ordering here (directories before leaves, then case-sensitive name order) is
//! shared with the document's file order, so a reader sees files in the same order
//! as the diagram.

use crate::tree::{NodeKind, TreeError, TreeNode};

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const CONTINUATION: &str = "|   ";
const BLANK: &str = "    ";

/// Children of `node`, directories first, each group in name order.
pub fn sorted_children(node: &TreeNode) -> Vec<&TreeNode> {
    // BTreeMap iteration is already name-ordered; a stable partition keeps that.
    let (mut ordered, leaves): (Vec<&TreeNode>, Vec<&TreeNode>) = node
        .children
        .values()
        .partition(|child| child.kind == NodeKind::Directory);
    ordered.extend(leaves);
    ordered
}

/// Every leaf below `root` in renderer order (depth-first, directories first).
pub fn collect_leaves(root: &TreeNode) -> Vec<&TreeNode> {
    let mut leaves = Vec::new();
    push_leaves(root, &mut leaves);
    leaves
}

fn push_leaves<'a>(node: &'a TreeNode, out: &mut Vec<&'a TreeNode>) {
    match node.kind {
        NodeKind::Leaf => out.push(node),
        NodeKind::Directory => {
            for child in sorted_children(node) {
                push_leaves(child, out);
            }
        }
    }
}

/// Render `root` as a fenced `text` block.
///
/// Fails when a node's name or path does not match its position, which means the
/// tree was not produced by [`crate::tree::build_tree`] from a consistent listing.
pub fn render_tree(root: &TreeNode) -> Result<String, TreeError> {
    let mut lines = vec![format!("{}/", root.name)];
    let children = sorted_children(root);
    let count = children.len();
    for (index, child) in children.into_iter().enumerate() {
        check_child(root, child)?;
        push_lines(child, "", index + 1 == count, &mut lines)?;
    }
    Ok(format!("```text\n{}\n```\n", lines.join("\n")))
}

fn push_lines(
    node: &TreeNode,
    prefix: &str,
    is_last: bool,
    lines: &mut Vec<String>,
) -> Result<(), TreeError> {
    let connector = if is_last { LAST_BRANCH } else { BRANCH };
    let suffix = if node.is_directory() { "/" } else { "" };
    lines.push(format!("{prefix}{connector}{}{suffix}", node.name));

    if node.kind == NodeKind::Leaf {
        if !node.children.is_empty() {
            return Err(TreeError::Malformed {
                path: node.path.clone(),
                reason: "leaf has children",
            });
        }
        return Ok(());
    }

    let child_prefix = format!("{prefix}{}", if is_last { BLANK } else { CONTINUATION });
    let children = sorted_children(node);
    let count = children.len();
    for (index, child) in children.into_iter().enumerate() {
        check_child(node, child)?;
        push_lines(child, &child_prefix, index + 1 == count, lines)?;
    }
    Ok(())
}

fn check_child(parent: &TreeNode, child: &TreeNode) -> Result<(), TreeError> {
    let malformed = |reason| TreeError::Malformed {
        path: child.path.clone(),
        reason,
    };
    if child.name.is_empty() {
        return Err(malformed("empty name"));
    }
    if child.name.contains('/') {
        return Err(malformed("name contains a path separator"));
    }
    let expected = if parent.is_root() {
        child.name.clone()
    } else {
        format!("{}/{}", parent.path, child.name)
    };
    if child.path != expected {
        return Err(malformed("path is not parent path joined with name"));
    }
    Ok(())
}

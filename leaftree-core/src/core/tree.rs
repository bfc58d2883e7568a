//! In-memory page tree with parent links.
//!
//! The persisted form ([`PageNode`]) only owns children. Loading flattens it
//! into an id-keyed arena where every entry also knows its parent, which is
//! what path derivation, cycle checks and detaching need. Saving rebuilds the
//! nested form from the arena in child order.

use crate::core::node::{PageNode, ROOT_ID};
use crate::{LeafTreeError, Result};
use std::collections::HashMap;

/// One node as held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: String,
    pub title: String,
    pub slug: String,
    /// `None` only for the root.
    pub parent: Option<String>,
    /// Child IDs in display order.
    pub children: Vec<String>,
    pub created_at: i64,
    pub modified_at: i64,
}

impl TreeNode {
    /// Creates a detached, childless node.
    pub fn new(id: String, title: String, slug: String, now: i64) -> Self {
        Self {
            id,
            title,
            slug,
            parent: None,
            children: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// A node with no children is stored as a single document; otherwise as a directory.
    pub fn shape(&self) -> NodeShape {
        if self.children.is_empty() {
            NodeShape::Leaf
        } else {
            NodeShape::Container
        }
    }
}

/// Physical form a node must take on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    /// `<path>.md`
    Leaf,
    /// `<path>/index.md` plus one entry per child.
    Container,
}

/// The page hierarchy, rooted at the reserved `"root"` node.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: HashMap<String, TreeNode>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates a tree holding only the root node.
    pub fn new() -> Self {
        Self::from_root(PageNode::root())
    }

    /// Flattens a persisted tree, assigning every child's parent to its container.
    ///
    /// A node whose ID was already seen elsewhere in the tree is dropped together
    /// with its subtree, keeping the arena a proper tree. The root always ends
    /// up under the reserved ID, so a descendant claiming it is dropped too.
    pub fn from_root(mut root: PageNode) -> Self {
        if root.id != ROOT_ID {
            log::warn!("Tree root has id '{}', loading it as '{ROOT_ID}'", root.id);
            root.id = ROOT_ID.to_string();
        }
        let mut nodes = HashMap::new();
        Self::flatten(root, None, &mut nodes);
        Self { nodes }
    }

    fn flatten(node: PageNode, parent: Option<String>, nodes: &mut HashMap<String, TreeNode>) -> bool {
        if nodes.contains_key(&node.id) {
            log::warn!("Dropping duplicate node id '{}' while loading tree", node.id);
            return false;
        }
        let id = node.id.clone();
        nodes.insert(
            id.clone(),
            TreeNode {
                id: id.clone(),
                title: node.title,
                slug: node.slug,
                parent,
                children: Vec::new(),
                created_at: node.created_at,
                modified_at: node.modified_at,
            },
        );
        let mut kept = Vec::with_capacity(node.children.len());
        for child in node.children {
            let child_id = child.id.clone();
            if Self::flatten(child, Some(id.clone()), nodes) {
                kept.push(child_id);
            }
        }
        if let Some(entry) = nodes.get_mut(&id) {
            entry.children = kept;
        }
        true
    }

    /// Rebuilds the nested, parent-free form used for persistence.
    pub fn to_root(&self) -> PageNode {
        self.snapshot(ROOT_ID).unwrap_or_else(PageNode::root)
    }

    /// Returns the nested form of the subtree rooted at `id`.
    pub fn snapshot(&self, id: &str) -> Option<PageNode> {
        let node = self.nodes.get(id)?;
        Some(PageNode {
            id: node.id.clone(),
            title: node.title.clone(),
            slug: node.slug.clone(),
            children: node
                .children
                .iter()
                .filter_map(|c| self.snapshot(c))
                .collect(),
            created_at: node.created_at,
            modified_at: node.modified_at,
        })
    }

    pub fn root(&self) -> &TreeNode {
        // The root is inserted on construction and never removed.
        &self.nodes[ROOT_ID]
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes, root included.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Depth-first search below the root. The root itself is never returned.
    pub fn find_by_id(&self, id: &str) -> Option<&TreeNode> {
        fn walk<'a>(tree: &'a Tree, ids: &[String], id: &str) -> Option<&'a TreeNode> {
            for child in ids {
                let node = tree.nodes.get(child)?;
                if node.id == id {
                    return Some(node);
                }
                if let Some(found) = walk(tree, &node.children, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(self, &self.root().children, id)
    }

    /// Derives the `/`-joined slug chain from the root (exclusive) to `id` (inclusive).
    ///
    /// The root's own contribution is empty, so `derive_path("root")` is `""`.
    pub fn derive_path(&self, id: &str) -> Option<String> {
        let mut segments = Vec::new();
        let mut current = self.nodes.get(id)?;
        while let Some(parent) = &current.parent {
            segments.push(current.slug.as_str());
            current = self.nodes.get(parent)?;
        }
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Returns the ID of `parent`'s child whose slug is `slug`.
    pub fn child_by_slug(&self, parent: &str, slug: &str) -> Option<&TreeNode> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .filter_map(|c| self.nodes.get(c))
            .find(|c| c.slug == slug)
    }

    /// Slugs currently used by `parent`'s children.
    pub fn sibling_slugs(&self, parent: &str) -> Vec<&str> {
        self.nodes
            .get(parent)
            .map(|p| {
                p.children
                    .iter()
                    .filter_map(|c| self.nodes.get(c))
                    .map(|c| c.slug.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True if `id` lies anywhere below `ancestor`.
    pub fn is_descendant(&self, ancestor: &str, id: &str) -> bool {
        let mut current = self.nodes.get(id).and_then(|n| n.parent.as_deref());
        while let Some(pid) = current {
            if pid == ancestor {
                return true;
            }
            current = self.nodes.get(pid).and_then(|n| n.parent.as_deref());
        }
        false
    }

    /// Every node below the root, keyed by its derived path.
    pub fn pages_by_path(&self) -> HashMap<String, &TreeNode> {
        let mut out = HashMap::new();
        let mut stack: Vec<(String, &str)> = self
            .root()
            .children
            .iter()
            .map(|c| (String::new(), c.as_str()))
            .collect();
        while let Some((prefix, id)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            let path = if prefix.is_empty() {
                node.slug.clone()
            } else {
                format!("{prefix}/{}", node.slug)
            };
            stack.extend(node.children.iter().map(|c| (path.clone(), c.as_str())));
            out.insert(path, node);
        }
        out
    }

    /// Walks one slug per segment starting below the root.
    pub fn find_by_route(&self, segments: &[&str]) -> Option<&TreeNode> {
        let mut current = self.root();
        for segment in segments {
            current = self.child_by_slug(&current.id, segment)?;
        }
        if current.parent.is_none() {
            return None;
        }
        Some(current)
    }

    /// Appends `node` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Leaves the tree untouched and returns [`LeafTreeError::ParentNotFound`]
    /// for an unknown parent, or [`LeafTreeError::IdGeneration`] if the node's
    /// ID is already present.
    pub(crate) fn append_child(&mut self, parent: &str, mut node: TreeNode) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(LeafTreeError::IdGeneration(format!("ID '{}' is already in use", node.id)));
        }
        let Some(p) = self.nodes.get_mut(parent) else {
            return Err(LeafTreeError::ParentNotFound(parent.to_string()));
        };
        p.children.push(node.id.clone());
        node.parent = Some(parent.to_string());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Removes `id` and every descendant, returning the removed IDs (subtree root first).
    pub(crate) fn remove_subtree(&mut self, id: &str) -> Vec<String> {
        self.unlink(id);
        let mut removed = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                stack.extend(node.children.iter().rev().cloned());
                removed.push(next);
            }
        }
        removed
    }

    /// Detaches `id` from its current parent and appends it under `new_parent`.
    pub(crate) fn reparent(&mut self, id: &str, new_parent: &str) {
        self.unlink(id);
        if let Some(p) = self.nodes.get_mut(new_parent) {
            p.children.push(id.to_string());
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(new_parent.to_string());
        }
    }

    fn unlink(&mut self, id: &str) {
        let parent = self.nodes.get(id).and_then(|n| n.parent.clone());
        if let Some(pid) = parent {
            if let Some(p) = self.nodes.get_mut(&pid) {
                p.children.retain(|c| c != id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, slug: &str, children: Vec<PageNode>) -> PageNode {
        PageNode {
            id: id.to_string(),
            title: slug.to_uppercase(),
            slug: slug.to_string(),
            children,
            created_at: 0,
            modified_at: 0,
        }
    }

    fn sample() -> Tree {
        let mut root = PageNode::root();
        root.children = vec![
            page("a", "docs", vec![page("b", "guide", vec![page("c", "install", vec![])])]),
            page("d", "blog", vec![]),
        ];
        Tree::from_root(root)
    }

    #[test]
    fn test_parents_rebuilt_on_load() {
        let tree = sample();
        assert_eq!(tree.get("a").unwrap().parent.as_deref(), Some("root"));
        assert_eq!(tree.get("c").unwrap().parent.as_deref(), Some("b"));
        assert!(tree.root().parent.is_none());
    }

    #[test]
    fn test_derive_path_excludes_root() {
        let tree = sample();
        assert_eq!(tree.derive_path("c").unwrap(), "docs/guide/install");
        assert_eq!(tree.derive_path("d").unwrap(), "blog");
        assert_eq!(tree.derive_path("root").unwrap(), "");
        assert!(tree.derive_path("missing").is_none());
    }

    #[test]
    fn test_to_root_preserves_order() {
        let tree = sample();
        let root = tree.to_root();
        assert_eq!(root.children[0].id, "a");
        assert_eq!(root.children[1].id, "d");
        assert_eq!(root.children[0].children[0].children[0].slug, "install");
    }

    #[test]
    fn test_find_by_id_skips_root() {
        let tree = sample();
        assert!(tree.find_by_id("root").is_none());
        assert_eq!(tree.find_by_id("c").unwrap().slug, "install");
    }

    #[test]
    fn test_find_by_route() {
        let tree = sample();
        assert_eq!(tree.find_by_route(&["docs", "guide"]).unwrap().id, "b");
        assert!(tree.find_by_route(&["docs", "nope"]).is_none());
        assert!(tree.find_by_route(&[]).is_none());
    }

    #[test]
    fn test_is_descendant() {
        let tree = sample();
        assert!(tree.is_descendant("a", "c"));
        assert!(!tree.is_descendant("c", "a"));
        assert!(!tree.is_descendant("a", "a"));
    }

    #[test]
    fn test_remove_subtree() {
        let mut tree = sample();
        let removed = tree.remove_subtree("a");
        assert_eq!(removed, vec!["a", "b", "c"]);
        assert_eq!(tree.root().children, vec!["d".to_string()]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_reparent_moves_subtree() {
        let mut tree = sample();
        tree.reparent("b", "d");
        assert_eq!(tree.derive_path("c").unwrap(), "blog/guide/install");
        assert!(tree.get("a").unwrap().children.is_empty());
        assert_eq!(tree.get("a").unwrap().shape(), NodeShape::Leaf);
        assert_eq!(tree.get("d").unwrap().shape(), NodeShape::Container);
    }

    #[test]
    fn test_foreign_root_id_does_not_collide_with_descendant() {
        let root = PageNode {
            id: "top".to_string(),
            title: "top".to_string(),
            slug: "top".to_string(),
            children: vec![
                page("a", "docs", vec![page("root", "impostor", vec![page("x", "deep", vec![])])]),
                page("d", "blog", vec![]),
            ],
            created_at: 0,
            modified_at: 0,
        };
        let tree = Tree::from_root(root);

        assert_eq!(tree.root().children, vec!["a".to_string(), "d".to_string()]);
        assert!(tree.get("a").unwrap().children.is_empty());
        assert!(tree.get("x").is_none());
        assert_eq!(tree.get("d").unwrap().parent.as_deref(), Some("root"));
        let snapshot = tree.to_root();
        assert_eq!(snapshot.id, "root");
        assert_eq!(snapshot.children.len(), 2);
        assert!(tree.find_by_id("root").is_none());
    }

    #[test]
    fn test_append_child_rejects_unknown_parent_and_duplicate_id() {
        let mut tree = sample();
        let before = tree.to_root();
        let err = tree.append_child("missing", TreeNode::new("n".into(), "N".into(), "n".into(), 0));
        assert!(matches!(err, Err(LeafTreeError::ParentNotFound(_))));
        let err = tree.append_child("d", TreeNode::new("a".into(), "A".into(), "again".into(), 0));
        assert!(matches!(err, Err(LeafTreeError::IdGeneration(_))));
        assert_eq!(tree.to_root(), before);

        tree.append_child("d", TreeNode::new("n".into(), "N".into(), "n".into(), 0)).unwrap();
        assert_eq!(tree.derive_path("n").unwrap(), "blog/n");
        assert_eq!(tree.get("d").unwrap().shape(), NodeShape::Container);
    }

    #[test]
    fn test_pages_by_path() {
        let tree = sample();
        let paths = tree.pages_by_path();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths["docs/guide/install"].id, "c");
        assert_eq!(paths["blog"].id, "d");
        assert!(!paths.contains_key(""));
    }

    #[test]
    fn test_duplicate_ids_are_dropped() {
        let mut root = PageNode::root();
        root.children = vec![page("a", "one", vec![]), page("a", "two", vec![])];
        let tree = Tree::from_root(root);
        assert_eq!(tree.root().children.len(), 1);
        assert_eq!(tree.get("a").unwrap().slug, "one");
    }
}

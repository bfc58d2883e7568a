use serde::{Deserialize, Serialize};

/// ID and slug reserved for the single root node of every tree.
pub const ROOT_ID: &str = "root";

/// One node of the persisted tree.
///
/// Children are owned inline; there is no parent field. Parent links are
/// derived state, rebuilt by [`Tree::from_root`](super::tree::Tree::from_root)
/// every time the tree is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNode {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub children: Vec<PageNode>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub modified_at: i64,
}

impl PageNode {
    /// Builds the reserved root node of an empty tree.
    pub fn root() -> Self {
        Self {
            id: ROOT_ID.to_string(),
            title: ROOT_ID.to_string(),
            slug: ROOT_ID.to_string(),
            children: Vec::new(),
            created_at: 0,
            modified_at: 0,
        }
    }
}

/// A node paired with the raw text of its document.
///
/// Assembled on demand; content never lives in the persisted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub title: String,
    pub slug: String,
    /// Derived `/`-joined slug path, root excluded.
    pub path: String,
    pub children: Vec<PageNode>,
    pub created_at: i64,
    pub modified_at: i64,
    pub content: String,
}

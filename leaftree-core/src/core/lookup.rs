//! Route-path inspection results.

use crate::core::node::PageNode;
use serde::{Deserialize, Serialize};

/// One segment of a looked-up path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathSegment {
    pub slug: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Which prefix of a route path exists in the tree.
///
/// Once a segment is missing, every later segment is reported missing too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathLookup {
    /// The normalised path (no leading, trailing or doubled slashes).
    pub path: String,
    pub segments: Vec<PathSegment>,
    /// True only if every segment exists.
    pub exists: bool,
}

/// Result of [`Workspace::ensure_page_path`](super::workspace::Workspace::ensure_page_path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsurePathResult {
    /// The page at the end of the path.
    pub page: PageNode,
    /// Pages created to complete the path, outermost first. Empty if it already existed.
    pub created: Vec<PageNode>,
}

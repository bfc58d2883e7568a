//! Result type for page removal.
//!
//! [`DeleteResult`] serializes in camelCase (`deletedCount`, `deletedIds`),
//! consistent with the other types handed to presentation layers.
//!
//! ```rust
//! use leaftree_core::DeleteResult;
//!
//! let result = DeleteResult {
//!     deleted_count: 2,
//!     deleted_ids: vec!["a".to_string(), "b".to_string()],
//! };
//! let json = serde_json::to_string(&result).unwrap();
//! assert!(json.contains("deletedCount"));
//! ```

use serde::{Deserialize, Serialize};

/// The outcome of [`Workspace::delete_page`](super::workspace::Workspace::delete_page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// The total number of pages removed, the target included.
    pub deleted_count: usize,

    /// IDs of every removed page, the target first, then its descendants depth-first.
    pub deleted_ids: Vec<String>,
}

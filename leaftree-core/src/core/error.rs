//! Error types for the Leaftree core library.

use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur within the Leaftree core library.
#[derive(Debug, Error)]
pub enum LeafTreeError {
    /// An operation was attempted before [`Workspace::load`](super::workspace::Workspace::load).
    #[error("Tree not loaded")]
    TreeNotLoaded,

    /// A page ID was requested that does not exist in the tree.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// The parent named by a create/move/sort call does not exist.
    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    /// A page exists in the tree but neither its document nor its directory is on disk.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A sibling with the same slug already exists under the target parent.
    #[error("Page already exists: {0}")]
    PageAlreadyExists(String),

    /// The physical destination of a create, rename or move is already taken.
    #[error("File already exists: {}", .0.display())]
    FileAlreadyExists(PathBuf),

    /// A slug is empty, reserved, or contains characters outside `[a-z0-9-]`.
    #[error("Invalid slug: {0}")]
    InvalidSlug(String),

    /// A non-recursive delete was requested for a page that still has children.
    #[error("Page has children: {0}")]
    PageHasChildren(String),

    /// A move would create a cycle or is otherwise invalid.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// A sort order is not a permutation of the parent's current children.
    #[error("Invalid sort order: {0}")]
    InvalidSortOrder(String),

    /// A route path contains an empty, `.` or `..` segment.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The ID generator could not produce a new identifier.
    #[error("Could not generate unique ID: {0}")]
    IdGeneration(String),

    /// An I/O operation on the storage directory failed.
    #[error("IO error: could not {context} {}: {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted tree could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The settings file could not be written.
    #[error("Config error: {0}")]
    Config(String),
}

/// Coarse classification of a [`LeafTreeError`], for callers that map errors
/// onto status codes or dialog styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArgument,
    Io,
    IdGeneration,
}

/// Convenience alias that pins the error type to [`LeafTreeError`].
pub type Result<T> = std::result::Result<T, LeafTreeError>;

impl LeafTreeError {
    /// Wraps an [`std::io::Error`] with the failed operation and the path it touched.
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { context, path, source }
    }

    /// Returns the taxonomy bucket this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PageNotFound(_) | Self::ParentNotFound(_) | Self::FileNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::PageAlreadyExists(_) | Self::FileAlreadyExists(_) => ErrorKind::Conflict,
            Self::TreeNotLoaded
            | Self::InvalidSlug(_)
            | Self::PageHasChildren(_)
            | Self::InvalidMove(_)
            | Self::InvalidSortOrder(_)
            | Self::InvalidPath(_) => ErrorKind::InvalidArgument,
            Self::Io { .. } | Self::Json(_) | Self::Config(_) => ErrorKind::Io,
            Self::IdGeneration(_) => ErrorKind::IdGeneration,
        }
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::TreeNotLoaded => "The page tree is not loaded yet".to_string(),
            Self::PageNotFound(_) => "Page no longer exists".to_string(),
            Self::ParentNotFound(_) => "Parent page no longer exists".to_string(),
            Self::FileNotFound(_) => "Page file is missing on disk".to_string(),
            Self::PageAlreadyExists(slug) => format!("A page named '{slug}' already exists here"),
            Self::FileAlreadyExists(_) => "A file with that name already exists".to_string(),
            Self::InvalidSlug(msg) => msg.clone(),
            Self::PageHasChildren(_) => "Delete the child pages first, or delete recursively".to_string(),
            Self::InvalidMove(msg) => msg.clone(),
            Self::InvalidSortOrder(msg) => msg.clone(),
            Self::InvalidPath(msg) => msg.clone(),
            Self::IdGeneration(_) => "Could not create page, please try again".to_string(),
            Self::Io { source, .. } => format!("File error: {source}"),
            Self::Json(e) => format!("Data format error: {e}"),
            Self::Config(msg) => msg.clone(),
        }
    }
}

//! Core library for Leaftree — a tree of markdown pages mirrored on disk.
//!
//! The primary entry point is [`Workspace`], which owns the in-memory page
//! tree of one storage directory. All page mutations go through `Workspace`
//! methods, which keep the tree file and the directory layout in lockstep.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use crate::core::{
    config::{
        default_storage_directory, load_config, save_config, WorkspaceConfig,
        DEFAULT_TREE_FILENAME,
    },
    delete::DeleteResult,
    error::{ErrorKind, LeafTreeError, Result},
    id::{IdGenerator, UuidGenerator},
    lookup::{EnsurePathResult, PathLookup, PathSegment},
    node::{Page, PageNode, ROOT_ID},
    page_store::{Artifact, DiskEntry, PageStore},
    slug::{normalize_slug, unique_slug, validate_slug, RESERVED_SLUGS},
    storage::Storage,
    tree::{NodeShape, Tree, TreeNode},
    workspace::Workspace,
};

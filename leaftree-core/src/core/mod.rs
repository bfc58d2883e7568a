//! Internal domain modules for the Leaftree core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod config;
pub mod delete;
pub mod error;
pub mod id;
pub mod lookup;
pub mod node;
pub mod page_store;
pub mod slug;
pub mod storage;
pub mod tree;
pub mod workspace;

#[doc(inline)]
pub use config::{load_config, save_config, WorkspaceConfig};
#[doc(inline)]
pub use delete::DeleteResult;
#[doc(inline)]
pub use error::{ErrorKind, LeafTreeError, Result};
#[doc(inline)]
pub use id::{IdGenerator, UuidGenerator};
#[doc(inline)]
pub use lookup::{EnsurePathResult, PathLookup, PathSegment};
#[doc(inline)]
pub use node::{Page, PageNode};
#[doc(inline)]
pub use page_store::PageStore;
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use tree::Tree;
#[doc(inline)]
pub use workspace::Workspace;

//! The page tree manager.
//!
//! Every mutation follows the same order: validate against the in-memory
//! tree, apply the physical effect through [`PageStore`], update the tree,
//! then persist the whole tree. A failure in the first two steps leaves both
//! the tree and the tree file untouched.
//!
//! There is no journal spanning the physical effect and the tree write. If
//! the process dies between the two, the storage directory and the tree file
//! can disagree until [`Workspace::reconstruct_from_fs`] is run. Loading never
//! does that on its own; it trusts the tree file.

use crate::core::node::ROOT_ID;
use crate::core::page_store::PageStore;
use crate::core::tree::{NodeShape, Tree, TreeNode};
use crate::{
    unique_slug, validate_slug, DeleteResult, EnsurePathResult, IdGenerator, LeafTreeError, Page,
    PageNode, PathLookup, PathSegment, Result, Storage, UuidGenerator, WorkspaceConfig,
};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// An open page workspace rooted at a storage directory.
///
/// `Workspace` is the primary interface for all page mutations. It owns the
/// in-memory [`Tree`], the [`PageStore`] that mirrors it on disk, and the
/// [`Storage`] holding the serialized tree.
///
/// All methods take `&self`; a single internal mutex serialises every
/// read-modify-write, so a `Workspace` can be shared across threads behind an
/// `Arc`.
pub struct Workspace {
    config: WorkspaceConfig,
    storage: Storage,
    store: PageStore,
    ids: Box<dyn IdGenerator>,
    tree: Mutex<Option<Tree>>,
}

impl Workspace {
    /// Creates an unloaded workspace using random UUIDs for page IDs.
    ///
    /// Call [`Self::load`] before any other operation, or use [`Self::open`].
    pub fn new(config: WorkspaceConfig) -> Self {
        Self::with_id_generator(config, Box::new(UuidGenerator))
    }

    /// Creates an unloaded workspace with a custom ID source.
    pub fn with_id_generator(config: WorkspaceConfig, ids: Box<dyn IdGenerator>) -> Self {
        let storage = Storage::new(&config.storage_dir, &config.tree_filename);
        let store = PageStore::new(&config.storage_dir);
        Self {
            config,
            storage,
            store,
            ids,
            tree: Mutex::new(None),
        }
    }

    /// Creates a workspace and loads its tree.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn open(config: WorkspaceConfig) -> Result<Self> {
        let ws = Self::new(config);
        ws.load()?;
        Ok(ws)
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, Option<Tree>> {
        // Mutations only touch the tree after their physical effect succeeded,
        // so a panicking holder cannot leave it half-updated.
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_tree<T>(&self, f: impl FnOnce(&mut Tree) -> Result<T>) -> Result<T> {
        let mut guard = self.state();
        let tree = guard.as_mut().ok_or(LeafTreeError::TreeNotLoaded)?;
        f(tree)
    }

    /// Reads the tree file, or starts a fresh tree holding only the root if
    /// there is none. Parent links are rebuilt from the nested children.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::Json`] for a corrupt tree file and
    /// [`LeafTreeError::Io`] if it cannot be read.
    pub fn load(&self) -> Result<()> {
        let tree = match self.storage.load()? {
            Some(root) => Tree::from_root(root),
            None => {
                log::info!(
                    "No tree file at {}, starting with an empty tree",
                    self.storage.path().display()
                );
                Tree::new()
            }
        };
        log::debug!("Loaded tree with {} pages", tree.len() - 1);
        *self.state() = Some(tree);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.state().is_some()
    }

    /// Writes the current tree to the tree file, replacing its content.
    pub fn save(&self) -> Result<()> {
        self.with_tree(|tree| self.persist(tree))
    }

    fn persist(&self, tree: &Tree) -> Result<()> {
        self.storage.save(&tree.to_root())
    }

    /// Returns a detached copy of the whole tree, root included.
    pub fn tree(&self) -> Result<PageNode> {
        self.with_tree(|tree| Ok(tree.to_root()))
    }

    /// Maps an optional parent ID onto a node ID; `None`, `""` and `"root"` name the root.
    fn resolve_parent(tree: &Tree, parent_id: Option<&str>) -> Result<String> {
        match parent_id {
            None | Some("") | Some(ROOT_ID) => Ok(ROOT_ID.to_string()),
            Some(pid) => tree
                .find_by_id(pid)
                .map(|p| p.id.clone())
                .ok_or_else(|| LeafTreeError::ParentNotFound(pid.to_string())),
        }
    }

    fn find_node<'t>(tree: &'t Tree, id: &str) -> Result<&'t TreeNode> {
        tree.find_by_id(id)
            .ok_or_else(|| LeafTreeError::PageNotFound(id.to_string()))
    }

    fn derive_path(tree: &Tree, id: &str) -> Result<String> {
        tree.derive_path(id)
            .ok_or_else(|| LeafTreeError::PageNotFound(id.to_string()))
    }

    /// Adds a page titled `title` with slug `slug` as the last child of
    /// `parent_id` (the root when `None`), and returns its new ID.
    ///
    /// The page's document is written first, seeded with a `# title` heading;
    /// a leaf parent is promoted to a directory. Only then is the page added
    /// to the tree and the tree saved.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::ParentNotFound`] for an unknown parent,
    /// [`LeafTreeError::InvalidSlug`] / [`LeafTreeError::PageAlreadyExists`]
    /// if the slug is unusable under that parent,
    /// [`LeafTreeError::IdGeneration`] if no ID could be produced, or any
    /// [`PageStore`] failure. The tree is unchanged in every failure case.
    pub fn add_page(&self, parent_id: Option<&str>, title: &str, slug: &str) -> Result<String> {
        self.with_tree(|tree| {
            let parent = Self::resolve_parent(tree, parent_id)?;
            let id = self.create_locked(tree, &parent, title, slug)?;
            self.persist(tree)?;
            Ok(id)
        })
    }

    /// Like [`Self::add_page`], but derives a sibling-unique slug from `title`
    /// while holding the workspace lock, so concurrent callers never race for
    /// the same slug.
    pub fn add_page_titled(&self, parent_id: Option<&str>, title: &str) -> Result<String> {
        self.with_tree(|tree| {
            let parent = Self::resolve_parent(tree, parent_id)?;
            let slug = unique_slug(tree.sibling_slugs(&parent), title);
            let id = self.create_locked(tree, &parent, title, &slug)?;
            self.persist(tree)?;
            Ok(id)
        })
    }

    /// Returns the slug [`Self::add_page_titled`] would currently pick.
    pub fn suggest_slug(&self, parent_id: Option<&str>, title: &str) -> Result<String> {
        self.with_tree(|tree| {
            let parent = Self::resolve_parent(tree, parent_id)?;
            Ok(unique_slug(tree.sibling_slugs(&parent), title))
        })
    }

    fn create_locked(&self, tree: &mut Tree, parent: &str, title: &str, slug: &str) -> Result<String> {
        validate_slug(slug)?;
        if tree.child_by_slug(parent, slug).is_some() {
            return Err(LeafTreeError::PageAlreadyExists(slug.to_string()));
        }

        let id = self.new_id(tree)?;
        let parent_path = Self::derive_path(tree, parent)?;
        self.store.create_page(&parent_path, slug, title)?;

        let path = join_path(&parent_path, slug);
        let now = chrono::Utc::now().timestamp();
        let node = TreeNode::new(id.clone(), title.to_string(), slug.to_string(), now);
        if let Err(e) = tree.append_child(parent, node) {
            if let Err(cleanup) = self.store.delete_page(&path) {
                log::warn!("Could not remove '{path}' after failed create: {cleanup}");
            }
            return Err(e);
        }
        log::info!("Created page '{id}' at '{path}'");
        Ok(id)
    }

    fn new_id(&self, tree: &Tree) -> Result<String> {
        let id = self.ids.generate()?;
        if id == ROOT_ID || tree.get(&id).is_some() {
            return Err(LeafTreeError::IdGeneration(format!("generated ID '{id}' is already in use")));
        }
        Ok(id)
    }

    /// Creates a new page under `target_parent` (the root when `None`) holding
    /// a copy of the content of page `id`, and returns the new page's ID.
    ///
    /// Only the page itself is copied, not its children. If writing the
    /// content fails, the new page is removed again.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::PageNotFound`] for an unknown source and
    /// otherwise fails like [`Self::add_page`].
    pub fn copy_page(&self, id: &str, target_parent: Option<&str>, title: &str, slug: &str) -> Result<String> {
        self.with_tree(|tree| {
            Self::find_node(tree, id)?;
            let source_path = Self::derive_path(tree, id)?;
            let content = self.store.read_page_content(&source_path)?;
            let parent = Self::resolve_parent(tree, target_parent)?;

            let copy = self.create_locked(tree, &parent, title, slug)?;
            let copy_path = Self::derive_path(tree, &copy)?;
            if let Err(e) = self.store.update_page(&copy_path, slug, &content) {
                if let Err(cleanup) = self.store.delete_page(&copy_path) {
                    log::warn!("Could not remove '{copy_path}' after failed copy: {cleanup}");
                }
                tree.remove_subtree(&copy);
                self.collapse_if_childless(tree, &parent);
                return Err(e);
            }
            log::info!("Copied page '{id}' from '{source_path}' to '{copy_path}'");
            self.persist(tree)?;
            Ok(copy)
        })
    }

    /// Deletes a page. Pages with children are only deleted when `recursive`
    /// is set, in which case every descendant goes too.
    ///
    /// If the parent is left without children, its directory is collapsed
    /// back into a single document on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::PageNotFound`] for an unknown ID and
    /// [`LeafTreeError::PageHasChildren`] when `recursive` is false and the
    /// page has children; in both cases nothing on disk is touched.
    pub fn delete_page(&self, id: &str, recursive: bool) -> Result<DeleteResult> {
        self.with_tree(|tree| {
            let node = Self::find_node(tree, id)?;
            if node.shape() == NodeShape::Container && !recursive {
                return Err(LeafTreeError::PageHasChildren(id.to_string()));
            }
            let parent = node
                .parent
                .clone()
                .ok_or_else(|| LeafTreeError::ParentNotFound(id.to_string()))?;
            let path = Self::derive_path(tree, id)?;

            self.store.delete_page(&path)?;

            let deleted_ids = tree.remove_subtree(id);
            log::info!("Deleted page '{id}' at '{path}' ({} pages)", deleted_ids.len());
            self.collapse_if_childless(tree, &parent);
            self.persist(tree)?;

            Ok(DeleteResult {
                deleted_count: deleted_ids.len(),
                deleted_ids,
            })
        })
    }

    fn collapse_if_childless(&self, tree: &Tree, id: &str) {
        let Some(node) = tree.get(id) else { return };
        if node.parent.is_none() || node.shape() == NodeShape::Container {
            return;
        }
        let Some(path) = tree.derive_path(id) else { return };
        if let Err(e) = self.store.collapse_if_empty(&path) {
            log::warn!("Could not collapse '{path}' back into a document: {e}");
        }
    }

    /// Renames a page and overwrites its content.
    ///
    /// When the slug changes, the page's document or directory is renamed on
    /// disk, which moves every descendant along with it.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::InvalidSlug`] or
    /// [`LeafTreeError::PageAlreadyExists`] for an unusable new slug, or any
    /// [`PageStore`] failure. The in-memory page is only changed after the
    /// disk update succeeded.
    pub fn update_page(&self, id: &str, slug: &str, title: &str, content: &str) -> Result<()> {
        self.with_tree(|tree| {
            let node = Self::find_node(tree, id)?;
            if node.slug != slug {
                validate_slug(slug)?;
                let parent = node.parent.as_deref().unwrap_or(ROOT_ID);
                if tree.child_by_slug(parent, slug).is_some() {
                    return Err(LeafTreeError::PageAlreadyExists(slug.to_string()));
                }
            }
            let path = Self::derive_path(tree, id)?;

            self.store.update_page(&path, slug, content)?;

            if let Some(node) = tree.get_mut(id) {
                node.title = title.to_string();
                node.slug = slug.to_string();
                node.modified_at = chrono::Utc::now().timestamp();
            }
            log::info!("Updated page '{id}' (was '{path}')");
            self.persist(tree)
        })
    }

    /// Moves a page, with its subtree, to the end of `new_parent_id`'s children
    /// (`""` or `"root"` for the root).
    ///
    /// A leaf target is promoted to a directory. Moving to the current parent
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::InvalidMove`] if the target is the page itself
    /// or one of its descendants, and [`LeafTreeError::PageAlreadyExists`] if
    /// the target already has a child with the same slug. Both are checked
    /// before anything on disk changes.
    pub fn move_page(&self, id: &str, new_parent_id: &str) -> Result<()> {
        self.with_tree(|tree| {
            let node = Self::find_node(tree, id)?;
            let new_parent = Self::resolve_parent(tree, Some(new_parent_id))?;
            if new_parent == id {
                return Err(LeafTreeError::InvalidMove("A page cannot be its own parent".to_string()));
            }
            if tree.is_descendant(id, &new_parent) {
                return Err(LeafTreeError::InvalidMove("Move would create a cycle".to_string()));
            }
            let old_parent = node.parent.clone().unwrap_or_else(|| ROOT_ID.to_string());
            if old_parent == new_parent {
                return Ok(());
            }
            if tree.child_by_slug(&new_parent, &node.slug).is_some() {
                return Err(LeafTreeError::PageAlreadyExists(node.slug.clone()));
            }
            let path = Self::derive_path(tree, id)?;
            let target_path = Self::derive_path(tree, &new_parent)?;

            self.store.move_page(&path, &target_path)?;

            tree.reparent(id, &new_parent);
            if let Some(node) = tree.get_mut(id) {
                node.modified_at = chrono::Utc::now().timestamp();
            }
            log::info!("Moved page '{id}' from '{path}' under '{target_path}'");
            self.collapse_if_childless(tree, &old_parent);
            self.persist(tree)
        })
    }

    /// Reorders the children of `parent_id` to match `ordered_ids`.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::InvalidSortOrder`] unless `ordered_ids` is a
    /// permutation of the parent's current child IDs.
    pub fn sort_pages(&self, parent_id: &str, ordered_ids: &[String]) -> Result<()> {
        self.with_tree(|tree| {
            let parent = Self::resolve_parent(tree, Some(parent_id))?;
            let current = tree
                .get(&parent)
                .map(|p| p.children.clone())
                .unwrap_or_default();
            if ordered_ids.len() != current.len() {
                return Err(LeafTreeError::InvalidSortOrder(format!(
                    "expected {} IDs, got {}",
                    current.len(),
                    ordered_ids.len()
                )));
            }
            let mut seen = std::collections::HashSet::new();
            for id in ordered_ids {
                if !current.contains(id) {
                    return Err(LeafTreeError::InvalidSortOrder(format!("'{id}' is not a child of '{parent}'")));
                }
                if !seen.insert(id) {
                    return Err(LeafTreeError::InvalidSortOrder(format!("duplicate ID '{id}'")));
                }
            }
            if let Some(p) = tree.get_mut(&parent) {
                p.children = ordered_ids.to_vec();
            }
            log::info!("Reordered children of '{parent}'");
            self.persist(tree)
        })
    }

    /// Finds a page node by ID, searching below the root.
    pub fn find_by_id(&self, id: &str) -> Result<PageNode> {
        self.with_tree(|tree| {
            Self::find_node(tree, id)?;
            tree.snapshot(id)
                .ok_or_else(|| LeafTreeError::PageNotFound(id.to_string()))
        })
    }

    /// Returns the page with ID `id`, including its content.
    pub fn get_page(&self, id: &str) -> Result<Page> {
        self.with_tree(|tree| {
            Self::find_node(tree, id)?;
            self.load_page(tree, id)
        })
    }

    /// Returns the page addressed by a `/`-separated slug path, including its content.
    pub fn find_by_route_path(&self, route_path: &str) -> Result<Page> {
        let segments = split_route(route_path)?;
        self.with_tree(|tree| {
            let id = tree
                .find_by_route(&segments)
                .map(|n| n.id.clone())
                .ok_or_else(|| LeafTreeError::PageNotFound(route_path.to_string()))?;
            self.load_page(tree, &id)
        })
    }

    fn load_page(&self, tree: &Tree, id: &str) -> Result<Page> {
        let path = Self::derive_path(tree, id)?;
        let node = tree
            .snapshot(id)
            .ok_or_else(|| LeafTreeError::PageNotFound(id.to_string()))?;
        let content = self.store.read_page_content(&path)?;
        log::debug!("Read page '{id}' from '{path}'");
        Ok(Page {
            id: node.id,
            title: node.title,
            slug: node.slug,
            path,
            children: node.children,
            created_at: node.created_at,
            modified_at: node.modified_at,
            content,
        })
    }

    /// Rebuilds the tree from the pages found in the storage directory,
    /// replaces the current tree with it and saves it.
    ///
    /// This is the repair path for a tree file that no longer matches the
    /// directory, and works whether or not a tree is loaded. Every `<slug>.md`
    /// becomes a page; every `<slug>/` becomes a page whose content is its
    /// `index.md`, which is created empty if missing. Directories left without
    /// children are collapsed into documents. Siblings are ordered by slug.
    ///
    /// Pages whose path is already in the loaded tree keep their ID, title and
    /// timestamps. Others get a fresh ID and take their title from the first
    /// `# ` heading of their document, falling back to the slug.
    pub fn reconstruct_from_fs(&self) -> Result<PageNode> {
        let mut guard = self.state();
        let known: HashMap<String, TreeNode> = guard
            .as_ref()
            .map(|tree| {
                tree.pages_by_path()
                    .into_iter()
                    .map(|(path, node)| (path, node.clone()))
                    .collect()
            })
            .unwrap_or_default();

        let mut tree = Tree::new();
        let now = chrono::Utc::now().timestamp();
        self.rebuild_children(&mut tree, ROOT_ID, "", &known, now)?;
        self.persist(&tree)?;

        log::info!(
            "Rebuilt tree with {} pages from {}",
            tree.len() - 1,
            self.config.storage_dir.display()
        );
        let root = tree.to_root();
        *guard = Some(tree);
        Ok(root)
    }

    fn rebuild_children(
        &self,
        tree: &mut Tree,
        parent: &str,
        parent_path: &str,
        known: &HashMap<String, TreeNode>,
        now: i64,
    ) -> Result<()> {
        for entry in self.store.list_pages(parent_path)? {
            let path = join_path(parent_path, &entry.slug);
            if entry.container {
                self.store.repair_index(&path)?;
            }
            let node = match known.get(&path).filter(|n| tree.get(&n.id).is_none()) {
                Some(prev) => {
                    let mut node = TreeNode::new(prev.id.clone(), prev.title.clone(), entry.slug.clone(), now);
                    node.created_at = prev.created_at;
                    node.modified_at = prev.modified_at;
                    node
                }
                None => {
                    let title = match self.store.read_title(&path) {
                        Ok(title) => title.unwrap_or_else(|| entry.slug.clone()),
                        Err(e) => {
                            log::warn!("Could not read title of '{path}': {e}");
                            entry.slug.clone()
                        }
                    };
                    TreeNode::new(self.new_id(tree)?, title, entry.slug.clone(), now)
                }
            };
            let id = node.id.clone();
            tree.append_child(parent, node)?;

            if entry.container {
                self.rebuild_children(tree, &id, &path, known, now)?;
                self.collapse_if_childless(tree, &id);
            }
        }
        Ok(())
    }

    /// Reports, segment by segment, how much of `route_path` exists.
    pub fn lookup_page_path(&self, route_path: &str) -> Result<PathLookup> {
        let segments = split_route(route_path)?;
        self.with_tree(|tree| Ok(lookup_locked(tree, &segments)))
    }

    /// Makes sure every segment of `route_path` exists, creating missing pages.
    ///
    /// Created intermediate pages are titled with their slug; the final page,
    /// if created, gets `title`. The tree is saved once at the end.
    pub fn ensure_page_path(&self, route_path: &str, title: &str) -> Result<EnsurePathResult> {
        let segments = split_route(route_path)?;
        if segments.is_empty() {
            return Err(LeafTreeError::InvalidPath("path must not be empty".to_string()));
        }
        self.with_tree(|tree| {
            let lookup = lookup_locked(tree, &segments);
            let mut created = Vec::new();
            let mut current = ROOT_ID.to_string();
            let last = lookup.segments.len() - 1;
            for (i, segment) in lookup.segments.iter().enumerate() {
                if let Some(id) = segment.id.as_ref().filter(|_| segment.exists) {
                    current = id.clone();
                    continue;
                }
                let seg_title = if i == last { title } else { segment.slug.as_str() };
                let id = match self.create_locked(tree, &current, seg_title, &segment.slug) {
                    Ok(id) => id,
                    Err(e) => {
                        if !created.is_empty() {
                            self.persist(tree)?;
                        }
                        return Err(e);
                    }
                };
                if let Some(node) = tree.snapshot(&id) {
                    created.push(node);
                }
                current = id;
            }
            if !created.is_empty() {
                self.persist(tree)?;
            }
            let page = tree
                .snapshot(&current)
                .ok_or_else(|| LeafTreeError::PageNotFound(current.clone()))?;
            Ok(EnsurePathResult { page, created })
        })
    }
}

fn lookup_locked(tree: &Tree, segments: &[&str]) -> PathLookup {
    let mut lookup = PathLookup {
        path: segments.join("/"),
        segments: Vec::with_capacity(segments.len()),
        exists: !segments.is_empty(),
    };
    let mut current = Some(tree.root());
    for slug in segments {
        let found = current.and_then(|parent| tree.child_by_slug(&parent.id, slug));
        lookup.segments.push(PathSegment {
            slug: (*slug).to_string(),
            exists: found.is_some(),
            id: found.map(|n| n.id.clone()),
            title: found.map(|n| n.title.clone()),
        });
        if found.is_none() {
            lookup.exists = false;
        }
        current = found;
    }
    lookup
}

/// Splits a route path into slugs, ignoring leading, trailing and doubled slashes.
fn split_route(route_path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = route_path
        .trim()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(bad) = segments.iter().find(|s| **s == "." || **s == "..") {
        return Err(LeafTreeError::InvalidPath(format!("invalid path segment: {bad:?}")));
    }
    Ok(segments)
}

fn join_path(parent: &str, slug: &str) -> String {
    if parent.is_empty() {
        slug.to_string()
    } else {
        format!("{parent}/{slug}")
    }
}

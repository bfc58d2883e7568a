//! Physical layout of pages under the storage directory.
//!
//! Every non-root page lives at its derived slug path. A page without
//! children is a single `<path>.md` document; a page with children is a
//! directory `<path>/` holding `index.md` (the page's own content) and one
//! entry per child. The root is the storage directory itself.
//!
//! [`PageStore`] is the only component that touches those paths. Callers pass
//! derived slug paths (`"docs/guide"`, `""` for the root) and never build
//! filesystem paths themselves.

use crate::core::storage::write_atomic;
use crate::{validate_slug, LeafTreeError, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extension of every page document.
pub const DOCUMENT_EXT: &str = "md";

/// File name of a container's own document.
pub const INDEX_FILE: &str = "index.md";

/// What a page currently is on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// A single document file.
    Leaf { file: PathBuf },
    /// A directory with its index document.
    Container { dir: PathBuf, index: PathBuf },
}

impl Artifact {
    /// The document holding the page's own content.
    pub fn document(&self) -> &Path {
        match self {
            Self::Leaf { file } => file.as_path(),
            Self::Container { index, .. } => index.as_path(),
        }
    }
}

/// A page found while scanning a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskEntry {
    pub slug: String,
    /// True for a `<slug>/` directory, false for a `<slug>.md` document.
    pub container: bool,
}

/// Filesystem adapter for page documents.
pub struct PageStore {
    storage_dir: PathBuf,
}

impl PageStore {
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> Self {
        Self {
            storage_dir: storage_dir.as_ref().to_path_buf(),
        }
    }

    fn dir_path(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.storage_dir.clone()
        } else {
            self.storage_dir.join(rel)
        }
    }

    fn leaf_path(&self, rel: &str) -> PathBuf {
        self.storage_dir.join(format!("{rel}.{DOCUMENT_EXT}"))
    }

    /// Finds the page at `rel`: `<rel>.md` first, then `<rel>/index.md`.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::FileNotFound`] if neither exists.
    pub fn resolve(&self, rel: &str) -> Result<Artifact> {
        if !rel.is_empty() {
            let file = self.leaf_path(rel);
            if file.is_file() {
                return Ok(Artifact::Leaf { file });
            }
        }
        let dir = self.dir_path(rel);
        if dir.is_dir() {
            let index = dir.join(INDEX_FILE);
            return Ok(Artifact::Container { dir, index });
        }
        Err(LeafTreeError::FileNotFound(self.leaf_path(rel)))
    }

    /// Makes sure `rel` is a directory that can hold children, and returns it.
    ///
    /// A leaf document is promoted: the directory is created and the document
    /// moves into it as `index.md`. If nothing exists at `rel`, the directory
    /// is created with an empty `index.md`.
    pub fn ensure_container(&self, rel: &str) -> Result<PathBuf> {
        let dir = self.dir_path(rel);
        if !rel.is_empty() {
            let file = self.leaf_path(rel);
            if file.is_file() {
                fs::create_dir_all(&dir).map_err(LeafTreeError::io("create directory", &dir))?;
                let index = dir.join(INDEX_FILE);
                fs::rename(&file, &index).map_err(LeafTreeError::io("move document into", &dir))?;
                log::info!("Promoted '{rel}' from document to directory");
                return Ok(dir);
            }
        }
        if !dir.is_dir() {
            fs::create_dir_all(&dir).map_err(LeafTreeError::io("create directory", &dir))?;
            let index = dir.join(INDEX_FILE);
            fs::File::create(&index).map_err(LeafTreeError::io("create", &index))?;
            log::debug!("Created directory for '{rel}' with empty index");
        }
        Ok(dir)
    }

    /// Creates the document for a new child `slug` under `parent_rel`, seeded
    /// with a heading for `title`. The parent is promoted first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::FileAlreadyExists`] if a document or directory
    /// with that slug is already present under the parent.
    pub fn create_page(&self, parent_rel: &str, slug: &str, title: &str) -> Result<PathBuf> {
        let parent_dir = self.dir_path(parent_rel);
        let file = parent_dir.join(format!("{slug}.{DOCUMENT_EXT}"));
        let dir = parent_dir.join(slug);
        if file.exists() {
            return Err(LeafTreeError::FileAlreadyExists(file));
        }
        if dir.exists() {
            return Err(LeafTreeError::FileAlreadyExists(dir));
        }

        self.ensure_container(parent_rel)?;

        let mut handle = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    LeafTreeError::FileAlreadyExists(file.clone())
                } else {
                    LeafTreeError::io("create", &file)(e)
                }
            })?;
        handle
            .write_all(format!("# {title}\n").as_bytes())
            .map_err(LeafTreeError::io("write", &file))?;
        Ok(file)
    }

    /// Removes the page at `rel`: its directory with everything beneath it,
    /// and its document file if one exists.
    pub fn delete_page(&self, rel: &str) -> Result<()> {
        self.resolve(rel)?;
        let dir = self.dir_path(rel);
        if dir.is_dir() {
            fs::remove_dir_all(&dir).map_err(LeafTreeError::io("remove directory", &dir))?;
        }
        let file = self.leaf_path(rel);
        if file.is_file() {
            fs::remove_file(&file).map_err(LeafTreeError::io("remove", &file))?;
        }
        Ok(())
    }

    /// Overwrites the content of the page at `rel` and, if `new_slug` differs
    /// from the last segment of `rel`, renames its document or directory.
    ///
    /// Renaming a directory carries every descendant with it.
    pub fn update_page(&self, rel: &str, new_slug: &str, content: &str) -> Result<()> {
        let artifact = self.resolve(rel)?;
        let (parent_rel, old_slug) = split_last(rel);

        let rename = if old_slug != new_slug {
            let parent_dir = self.dir_path(parent_rel);
            let new_file = parent_dir.join(format!("{new_slug}.{DOCUMENT_EXT}"));
            let new_dir = parent_dir.join(new_slug);
            if new_file.exists() {
                return Err(LeafTreeError::FileAlreadyExists(new_file));
            }
            if new_dir.exists() {
                return Err(LeafTreeError::FileAlreadyExists(new_dir));
            }
            Some(match &artifact {
                Artifact::Leaf { file } => (file.clone(), new_file),
                Artifact::Container { dir, .. } => (dir.clone(), new_dir),
            })
        } else {
            None
        };

        write_atomic(artifact.document(), content.as_bytes())?;

        if let Some((from, to)) = rename {
            fs::rename(&from, &to).map_err(LeafTreeError::io("rename", &from))?;
            log::info!("Renamed '{rel}' to slug '{new_slug}'");
        }
        Ok(())
    }

    /// Relocates the page at `rel`, with its whole subtree, under `target_parent_rel`.
    ///
    /// The destination keeps the page's own slug as its final segment. A leaf
    /// target is promoted to a directory first.
    ///
    /// # Errors
    ///
    /// Returns [`LeafTreeError::FileAlreadyExists`] if the target already holds
    /// an entry with this slug. Nothing is changed on disk in that case.
    pub fn move_page(&self, rel: &str, target_parent_rel: &str) -> Result<PathBuf> {
        let artifact = self.resolve(rel)?;
        let (_, slug) = split_last(rel);

        let target_dir = self.dir_path(target_parent_rel);
        let (from, to) = match &artifact {
            Artifact::Leaf { file } => (file.clone(), target_dir.join(format!("{slug}.{DOCUMENT_EXT}"))),
            Artifact::Container { dir, .. } => (dir.clone(), target_dir.join(slug)),
        };
        let clash = [
            target_dir.join(format!("{slug}.{DOCUMENT_EXT}")),
            target_dir.join(slug),
        ];
        if let Some(existing) = clash.into_iter().find(|p| p.exists()) {
            return Err(LeafTreeError::FileAlreadyExists(existing));
        }

        self.ensure_container(target_parent_rel)?;
        fs::rename(&from, &to).map_err(LeafTreeError::io("move", &from))?;
        log::info!("Moved '{rel}' under '{target_parent_rel}'");
        Ok(to)
    }

    /// Returns the raw text of the page at `rel`.
    pub fn read_page_content(&self, rel: &str) -> Result<String> {
        let artifact = self.resolve(rel)?;
        let doc = artifact.document();
        if !doc.is_file() {
            return Err(LeafTreeError::FileNotFound(doc.to_path_buf()));
        }
        fs::read_to_string(doc).map_err(LeafTreeError::io("read", doc))
    }

    /// Turns a childless directory at `rel` back into a single document.
    ///
    /// Only acts when the directory contains nothing but `index.md`; returns
    /// whether the page was collapsed. The root is never collapsed.
    pub fn collapse_if_empty(&self, rel: &str) -> Result<bool> {
        if rel.is_empty() {
            return Ok(false);
        }
        let dir = self.dir_path(rel);
        let file = self.leaf_path(rel);
        if !dir.is_dir() || file.exists() {
            return Ok(false);
        }
        let mut entries = fs::read_dir(&dir).map_err(LeafTreeError::io("list", &dir))?;
        let only_index = match (entries.next(), entries.next()) {
            (Some(first), None) => {
                let first = first.map_err(LeafTreeError::io("list", &dir))?;
                first.file_name() == INDEX_FILE
            }
            _ => false,
        };
        if !only_index {
            return Ok(false);
        }
        fs::rename(dir.join(INDEX_FILE), &file).map_err(LeafTreeError::io("move index out of", &dir))?;
        fs::remove_dir(&dir).map_err(LeafTreeError::io("remove directory", &dir))?;
        log::info!("Collapsed '{rel}' from directory to document");
        Ok(true)
    }

    /// Lists the pages stored directly under `rel`, ordered by slug.
    ///
    /// Hidden entries, `index.md`, non-markdown files and names that are not
    /// valid slugs are skipped. When both `<slug>.md` and `<slug>/` exist the
    /// directory wins. A missing directory has no pages.
    pub fn list_pages(&self, rel: &str) -> Result<Vec<DiskEntry>> {
        let dir = self.dir_path(rel);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut found: BTreeMap<String, bool> = BTreeMap::new();
        for entry in fs::read_dir(&dir).map_err(LeafTreeError::io("list", &dir))? {
            let entry = entry.map_err(LeafTreeError::io("list", &dir))?;
            let Ok(name) = entry.file_name().into_string() else {
                log::warn!("Skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            if name.starts_with('.') || name == INDEX_FILE {
                continue;
            }
            let container = entry.path().is_dir();
            let slug = if container {
                name.as_str()
            } else {
                match name.strip_suffix(&format!(".{DOCUMENT_EXT}")) {
                    Some(stem) => stem,
                    None => continue,
                }
            };
            if let Err(e) = validate_slug(slug) {
                log::warn!("Skipping '{name}' in {}: {e}", dir.display());
                continue;
            }
            let seen = found.entry(slug.to_string()).or_insert(container);
            if *seen != container {
                log::warn!("Both '{slug}.{DOCUMENT_EXT}' and '{slug}/' exist in {}, using the directory", dir.display());
                *seen = true;
            }
        }
        Ok(found
            .into_iter()
            .map(|(slug, container)| DiskEntry { slug, container })
            .collect())
    }

    /// Gives a directory page without `index.md` an empty one. Returns whether
    /// a file was created.
    pub fn repair_index(&self, rel: &str) -> Result<bool> {
        let dir = self.dir_path(rel);
        let index = dir.join(INDEX_FILE);
        if !dir.is_dir() || index.exists() {
            return Ok(false);
        }
        fs::File::create(&index).map_err(LeafTreeError::io("create", &index))?;
        log::info!("Created missing index for '{rel}'");
        Ok(true)
    }

    /// Returns the text of the first `# ` heading of the page at `rel`, if any.
    pub fn read_title(&self, rel: &str) -> Result<Option<String>> {
        let content = self.read_page_content(rel)?;
        Ok(heading_title(&content))
    }
}

fn heading_title(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.strip_prefix("# "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Splits `"a/b/c"` into `("a/b", "c")` and `"c"` into `("", "c")`.
fn split_last(rel: &str) -> (&str, &str) {
    match rel.rsplit_once('/') {
        Some((parent, last)) => (parent, last),
        None => ("", rel),
    }
}

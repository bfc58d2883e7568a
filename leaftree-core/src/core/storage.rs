use crate::core::node::PageNode;
use crate::{LeafTreeError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Reads and writes the serialized tree file inside the storage directory.
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(storage_dir: P, tree_filename: &str) -> Self {
        Self {
            path: storage_dir.as_ref().join(tree_filename),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted tree, or `None` if no tree file exists yet.
    pub fn load(&self) -> Result<Option<PageNode>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)
            .map_err(LeafTreeError::io("read tree file", &self.path))?;
        let root: PageNode = serde_json::from_str(&data)?;
        Ok(Some(root))
    }

    /// Replaces the tree file with `root`, atomically.
    pub fn save(&self, root: &PageNode) -> Result<()> {
        let data = serde_json::to_vec(root)?;
        write_atomic(&self.path, &data)
    }
}

/// Writes `data` to a temp file next to `path` and renames it into place, so
/// readers never observe a half-written file.
///
/// The replacement keeps the permissions of the file it replaces; a new file
/// gets `0644` on Unix rather than the temp file's owner-only mode.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(LeafTreeError::io("create directory", dir))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(LeafTreeError::io("create temp file in", dir))?;
    tmp.write_all(data)
        .map_err(LeafTreeError::io("write temp file for", path))?;
    if let Some(perms) = target_permissions(path) {
        tmp.as_file()
            .set_permissions(perms)
            .map_err(LeafTreeError::io("set permissions on temp file for", path))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(LeafTreeError::io("sync temp file for", path))?;
    tmp.persist(path)
        .map_err(|e| LeafTreeError::io("replace", path)(e.error))?;
    Ok(())
}

fn target_permissions(path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};

pub const DEFAULT_EXTENSION: &str = "md";

/// Filesystem façade scoped to one root directory.
///
/// Implementations never recover internally; every failure is returned to the caller.
pub trait FileStore: Send + Sync {
    /// Root directory holding the records.
    fn root(&self) -> &Path;

    /// Record file extension, without the leading dot.
    fn extension(&self) -> &str;

    /// Every record file below the root, in no particular order.
    fn list(&self) -> StoreResult<Vec<PathBuf>>;

    /// Fails with `FileNotFound` if the file is gone.
    fn read(&self, path: &Path) -> StoreResult<Vec<u8>>;

    /// Creates or replaces the file.
    fn write(&self, path: &Path, contents: &[u8]) -> StoreResult<()>;

    /// Fails with `FileNotFound` if the file is absent.
    fn delete(&self, path: &Path) -> StoreResult<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Path for a record file name directly under the root.
    fn path_for(&self, file_name: &str) -> PathBuf {
        self.root().join(file_name)
    }
}

/// Local-disk record storage.
#[derive(Debug, Clone)]
pub struct FsFileStore {
    root: PathBuf,
    extension: String,
}

impl FsFileStore {
    /// Opens a store over `root` for `.md` records, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::with_extension(root, DEFAULT_EXTENSION)
    }

    pub fn with_extension(root: impl Into<PathBuf>, extension: &str) -> StoreResult<Self> {
        let store = Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_lowercase(),
        };
        store.ensure_root()?;
        Ok(store)
    }

    fn ensure_root(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))
    }

    fn is_record(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| {
                name.to_lowercase()
                    .ends_with(&format!(".{}", self.extension))
            })
            .unwrap_or(false)
    }

    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{}.tmp", name))
    }
}

fn map_missing(path: &Path, err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::FileNotFound(path.to_path_buf())
    } else {
        StoreError::io(path, err)
    }
}

impl FileStore for FsFileStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn list(&self) -> StoreResult<Vec<PathBuf>> {
        self.ensure_root()?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                StoreError::io(path, e.into())
            })?;
            if entry.file_type().is_file() && self.is_record(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn read(&self, path: &Path) -> StoreResult<Vec<u8>> {
        fs::read(path).map_err(|e| map_missing(path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        // Write a hidden sibling and rename it into place so readers never see a partial record.
        let temp = Self::temp_path(path);
        let result = fs::File::create(&temp)
            .and_then(|mut file| {
                file.write_all(contents)?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&temp, path));

        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(StoreError::io(path, e));
        }
        Ok(())
    }

    fn delete(&self, path: &Path) -> StoreResult<()> {
        fs::remove_file(path).map_err(|e| map_missing(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

//! The snippet store: an in-memory index rebuilt from disk, kept consistent
//! with the record files on every save and delete.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::models::{FileStore, FsFileStore, Snippet, codec};
use crate::search::{self, SearchOptions, SearchResult};

/// A record file that `load_all` could not index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a full reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedFile>,
}

/// A tag and how many snippets carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Default)]
struct Index {
    snippets: BTreeMap<String, Snippet>,
    /// Where each indexed id was last read from or written to.
    files: HashMap<String, PathBuf>,
    loaded: bool,
}

/// Snippet store backed by one record file per snippet.
///
/// All index access goes through one reader/writer lock: lookups and searches
/// share it, while `load_all`, `save` and `delete` hold it exclusively,
/// including across their disk I/O. Callers only ever receive copies.
pub struct SnippetStore<F: FileStore = FsFileStore> {
    files: F,
    index: RwLock<Index>,
}

impl SnippetStore<FsFileStore> {
    /// Opens a store over `root`, creating the directory if needed. The index starts empty.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Ok(Self::with_file_store(FsFileStore::new(root)?))
    }
}

impl<F: FileStore> SnippetStore<F> {
    pub fn with_file_store(files: F) -> Self {
        Self {
            files,
            index: RwLock::new(Index::default()),
        }
    }

    pub fn root(&self) -> &Path {
        self.files.root()
    }

    /// Rebuilds the index from every record on disk.
    ///
    /// Files that cannot be read, decoded or validated are skipped and reported.
    /// When several files hold the same id, the most recently updated one wins.
    /// Only a failure to list the directory aborts the load, leaving the
    /// previous index in place.
    pub fn load_all(&self) -> StoreResult<LoadReport> {
        let mut index = self.index.write();

        let mut paths = self.files.list()?;
        paths.sort();

        let mut fresh = Index {
            loaded: true,
            ..Index::default()
        };
        let mut report = LoadReport::default();

        for path in paths {
            let snippet = match self.read_record(&path) {
                Ok(snippet) => snippet,
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                    report.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let loser = match fresh.snippets.get(&snippet.id) {
                Some(existing) if snippet.updated_at <= existing.updated_at => Some(path),
                _ => {
                    let previous = fresh.files.insert(snippet.id.clone(), path);
                    fresh.snippets.insert(snippet.id.clone(), snippet.clone());
                    previous
                }
            };
            if let Some(loser) = loser {
                tracing::warn!(
                    "skipping {}: older duplicate of snippet {}",
                    loser.display(),
                    snippet.id
                );
                report.skipped.push(SkippedFile {
                    path: loser,
                    reason: format!("older duplicate of snippet {}", snippet.id),
                });
            }
        }

        report.loaded = fresh.snippets.len();
        *index = fresh;

        tracing::info!(
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "loaded snippets from {}",
            self.files.root().display()
        );
        Ok(report)
    }

    fn read_record(&self, path: &Path) -> StoreResult<Snippet> {
        let bytes = self.files.read(path)?;
        let snippet = codec::decode_bytes(&bytes)?;
        snippet.validate()?;
        Ok(snippet)
    }

    /// Persists a snippet and indexes it under its id (an upsert).
    ///
    /// The snippet is validated, stamped with a fresh `updated_at`, and written
    /// under a new file name. Once that write succeeds, the file that
    /// previously held the same id is removed, then the index is updated.
    /// On success `snippet` carries the new timestamp and the stored copy is returned.
    pub fn save(&self, snippet: &mut Snippet) -> StoreResult<Snippet> {
        snippet.validate()?;

        let mut index = self.index.write();

        let mut stored = snippet.clone();
        stored.touch();

        let previous = index.files.get(&stored.id).cloned();
        let path = self.unique_path(&index, &stored, previous.as_deref());
        let text = codec::encode(&stored)?;
        self.files.write(&path, text.as_bytes())?;
        tracing::debug!("wrote snippet {} to {}", stored.id, path.display());

        if let Some(old) = previous.filter(|old| *old != path) {
            match self.files.delete(&old) {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => tracing::warn!(
                    "could not remove superseded record {}: {}",
                    old.display(),
                    e
                ),
            }
        }

        index.files.insert(stored.id.clone(), path);
        index.snippets.insert(stored.id.clone(), stored.clone());

        snippet.updated_at = stored.updated_at;
        Ok(stored)
    }

    /// A path for the snippet's derived file name that no other snippet occupies.
    fn unique_path(&self, index: &Index, snippet: &Snippet, own: Option<&Path>) -> PathBuf {
        let stem = snippet.file_stem();
        let extension = self.files.extension();

        let taken = |candidate: &Path| {
            own != Some(candidate)
                && (self.files.exists(candidate)
                    || index.files.values().any(|p| p.as_path() == candidate))
        };

        let mut candidate = self.files.path_for(&format!("{}.{}", stem, extension));
        let mut suffix = 2;
        while taken(&candidate) {
            candidate = self
                .files
                .path_for(&format!("{}_{}.{}", stem, suffix, extension));
            suffix += 1;
        }
        candidate
    }

    /// Removes a snippet's record files and its index entry.
    ///
    /// Every record on disk that decodes to `id` is deleted. Fails with
    /// `NotFound` if the id is not indexed and with `MissingFile` if no record
    /// holds it; the index is left untouched in both cases.
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let mut index = self.index.write();

        if !index.snippets.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let mut removed = 0;
        for path in self.files.list()? {
            let holds_id = self
                .files
                .read(&path)
                .and_then(|bytes| codec::decode_bytes(&bytes))
                .map(|snippet| snippet.id == id)
                .unwrap_or(false);
            if holds_id {
                self.files.delete(&path)?;
                tracing::debug!("deleted {} for snippet {}", path.display(), id);
                removed += 1;
            }
        }

        if removed == 0 {
            return Err(StoreError::MissingFile(id.to_string()));
        }

        index.snippets.remove(id);
        index.files.remove(id);
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<Snippet> {
        self.index
            .read()
            .snippets
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Copies of every indexed snippet, ordered by id.
    pub fn get_all(&self) -> Vec<Snippet> {
        self.index.read().snippets.values().cloned().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.read().snippets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.index.read().snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().snippets.is_empty()
    }

    /// Whether `load_all` has completed at least once.
    pub fn is_loaded(&self) -> bool {
        self.index.read().loaded
    }

    /// Path of the record file currently backing `id`, if known.
    pub fn file_of(&self, id: &str) -> Option<PathBuf> {
        self.index.read().files.get(id).cloned()
    }

    pub fn favorites(&self) -> Vec<Snippet> {
        self.index
            .read()
            .snippets
            .values()
            .filter(|s| s.is_favorite)
            .cloned()
            .collect()
    }

    /// Distinct tags, merged case-insensitively, sorted by name.
    pub fn tags(&self) -> Vec<TagCount> {
        let index = self.index.read();
        let mut counts: BTreeMap<String, TagCount> = BTreeMap::new();
        for snippet in index.snippets.values() {
            let mut seen = Vec::new();
            for tag in &snippet.tags {
                let key = tag.to_lowercase();
                if seen.contains(&key) {
                    continue;
                }
                counts
                    .entry(key.clone())
                    .or_insert_with(|| TagCount {
                        name: tag.clone(),
                        count: 0,
                    })
                    .count += 1;
                seen.push(key);
            }
        }
        counts.into_values().collect()
    }

    /// Ranked search over titles, tags and bodies without filters.
    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search_with_filters(&SearchOptions::new().query(query))
    }

    pub fn search_with_filters(&self, options: &SearchOptions) -> Vec<SearchResult> {
        let index = self.index.read();
        search::rank(index.snippets.values(), options)
    }
}

impl<F: FileStore> std::fmt::Debug for SnippetStore<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnippetStore")
            .field("root", &self.files.root())
            .field("snippet_count", &self.len())
            .finish()
    }
}

use crate::context::ProjectContext;
use crate::error::Result;
use crate::loader::ProjectIndexer;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;

pub const DEFAULT_CACHE_CAPACITY: usize = 8;

struct CachedIndex {
    watermark: String,
    context: Arc<ProjectContext>,
}

/// In-memory LRU of loaded project contexts, keyed by root.
///
/// An entry is reused only while its watermark (file list plus sizes and
/// modification times) still matches the tree on disk.
pub struct ProjectIndexCache {
    entries: Mutex<LruCache<PathBuf, CachedIndex>>,
}

impl Default for ProjectIndexCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ProjectIndexCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached context when fresh, otherwise a new load that replaces the entry.
    pub fn load(&self, indexer: &ProjectIndexer, use_cache: bool) -> Result<Arc<ProjectContext>> {
        let files = indexer.scan_files();
        let watermark = compute_watermark(indexer.root(), &files);
        let key = indexer.root().to_path_buf();

        if use_cache {
            let mut entries = self.entries.lock().expect("index cache mutex poisoned");
            if let Some(hit) = entries.get(&key) {
                if hit.watermark == watermark {
                    log::debug!("Index cache hit for {}", key.display());
                    return Ok(Arc::clone(&hit.context));
                }
                log::debug!("Index cache stale for {}", key.display());
            }
        }

        let context = Arc::new(indexer.load_files(files)?);
        self.entries
            .lock()
            .expect("index cache mutex poisoned")
            .put(
                key,
                CachedIndex {
                    watermark,
                    context: Arc::clone(&context),
                },
            );
        Ok(context)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("index cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("index cache mutex poisoned").clear();
    }
}

/// Hex digest of the file list with each file's size and mtime.
pub fn compute_watermark(root: &Path, files: &[String]) -> String {
    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.as_bytes());
        if let Ok(meta) = std::fs::metadata(root.join(file)) {
            hasher.update(meta.len().to_le_bytes());
            let mtime = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            hasher.update(mtime.to_le_bytes());
        }
        hasher.update(b"\0");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reuses_fresh_entries() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("index.ts"), "export const a = 1;\n").unwrap();
        let indexer = ProjectIndexer::new(temp.path()).unwrap();
        let cache = ProjectIndexCache::new(2);

        let first = cache.load(&indexer, true).unwrap();
        let second = cache.load(&indexer, true).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let bypass = cache.load(&indexer, false).unwrap();
        assert!(!Arc::ptr_eq(&first, &bypass));
    }

    #[test]
    fn reloads_when_files_change() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("index.ts"), "export const a = 1;\n").unwrap();
        let indexer = ProjectIndexer::new(temp.path()).unwrap();
        let cache = ProjectIndexCache::default();

        let first = cache.load(&indexer, true).unwrap();
        fs::write(temp.path().join("extra.ts"), "export const b = 2;\n").unwrap();
        let second = cache.load(&indexer, true).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(second.has_export("b"));
    }

    #[test]
    fn watermark_depends_on_file_list() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.rs"), "fn a() {}").unwrap();
        let one = compute_watermark(temp.path(), &["a.rs".to_string()]);
        let same = compute_watermark(temp.path(), &["a.rs".to_string()]);
        let other = compute_watermark(temp.path(), &["a.rs".to_string(), "b.rs".to_string()]);
        assert_eq!(one, same);
        assert_ne!(one, other);
    }
}

//! Narrow interfaces the pipeline talks to, with the default implementations.
//!
//! Each default is built once through [`Collaborators::default_stack`] and shared
//! by every request that goes through the same engine.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use context_graph::ImportGraph;
use context_indexer::{
    fingerprint_files, ProjectContext, ProjectIndexCache, ProjectIndexer, SyntaxSearch,
};
use context_protocol::{
    estimate_tokens, truncate_to_tokens, CandidateSymbol, JumpTarget, MiniBundleItem,
    RepoFingerprint, StructuralQuery,
};
use context_search::{default_matchers, Matcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Loads the read-only project snapshot for one request.
#[async_trait]
pub trait ProjectIndexLoader: Send + Sync {
    /// Never fails: a project that cannot be loaded yields an empty context.
    async fn load(&self, project_path: &Path, use_cache: bool) -> Arc<ProjectContext>;
}

/// Structural pattern matching over project files.
#[async_trait]
pub trait StructuralSearch: Send + Sync {
    async fn run(
        &self,
        root: &Path,
        files: &[String],
        queries: &[StructuralQuery],
        max_matches: usize,
    ) -> Result<Vec<CandidateSymbol>>;
}

#[async_trait]
pub trait ImportGraphBuilder: Send + Sync {
    async fn build(&self, context: &ProjectContext) -> ImportGraph;
}

/// Token-budgeted snippet extraction for jump targets.
#[async_trait]
pub trait BundleAssembler: Send + Sync {
    async fn assemble(
        &self,
        root: &Path,
        targets: &[JumpTarget],
        max_tokens: usize,
    ) -> Vec<MiniBundleItem>;
}

#[async_trait]
pub trait RepoFingerprinter: Send + Sync {
    async fn fingerprint(&self, files: &[String]) -> RepoFingerprint;
}

/// Indexer-backed loader sharing one LRU cache across requests.
pub struct IndexCacheLoader {
    cache: Arc<ProjectIndexCache>,
}

impl IndexCacheLoader {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Arc::new(ProjectIndexCache::new(capacity)),
        }
    }
}

impl Default for IndexCacheLoader {
    fn default() -> Self {
        Self::new(context_indexer::DEFAULT_CACHE_CAPACITY)
    }
}

#[async_trait]
impl ProjectIndexLoader for IndexCacheLoader {
    async fn load(&self, project_path: &Path, use_cache: bool) -> Arc<ProjectContext> {
        let cache = Arc::clone(&self.cache);
        let root: PathBuf = project_path.to_path_buf();
        let task_root = root.clone();
        let loaded = tokio::task::spawn_blocking(move || {
            let indexer = ProjectIndexer::new(&task_root)?;
            cache.load(&indexer, use_cache)
        })
        .await;

        match loaded {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => {
                log::warn!(
                    "Project index unavailable for {}: {e}; continuing with an empty context",
                    root.display()
                );
                Arc::new(ProjectContext::empty(&root))
            }
            Err(e) => {
                log::warn!("Project index task failed for {}: {e}", root.display());
                Arc::new(ProjectContext::empty(&root))
            }
        }
    }
}

/// Raises its flag when dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Tree-sitter fact search run on the blocking pool.
///
/// Dropping the returned future (for example when a timeout fires) cancels the
/// blocking search before its next file.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntaxStructuralSearch;

#[async_trait]
impl StructuralSearch for SyntaxStructuralSearch {
    async fn run(
        &self,
        root: &Path,
        files: &[String],
        queries: &[StructuralQuery],
        max_matches: usize,
    ) -> Result<Vec<CandidateSymbol>> {
        let cancel = Arc::new(AtomicBool::new(false));
        let _cancel_on_drop = CancelOnDrop(Arc::clone(&cancel));
        let search = SyntaxSearch::new(root).with_cancel_flag(cancel);
        let files = files.to_vec();
        let queries = queries.to_vec();
        tokio::task::spawn_blocking(move || search.run(&files, &queries, max_matches))
            .await
            .map_err(|e| EngineError::Other(format!("structural search task failed: {e}")))?
            .map_err(EngineError::from)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContextImportGraph;

#[async_trait]
impl ImportGraphBuilder for ContextImportGraph {
    async fn build(&self, context: &ProjectContext) -> ImportGraph {
        ImportGraph::from_context(context)
    }
}

/// Cuts each target's lines out of its file, in target order, until the budget is spent.
#[derive(Debug, Clone)]
pub struct SnippetAssembler {
    max_snippet_lines: usize,
}

impl SnippetAssembler {
    pub fn new(max_snippet_lines: usize) -> Self {
        Self {
            max_snippet_lines: max_snippet_lines.max(1),
        }
    }

    fn cut(&self, text: &str, target: &JumpTarget) -> String {
        let start = target.start.unwrap_or(1).max(1);
        let end = target
            .end
            .unwrap_or(start)
            .max(start)
            .min(start + self.max_snippet_lines - 1);
        text.lines()
            .skip(start - 1)
            .take(end - start + 1)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for SnippetAssembler {
    fn default() -> Self {
        Self::new(EngineConfig::default().max_snippet_lines)
    }
}

#[async_trait]
impl BundleAssembler for SnippetAssembler {
    async fn assemble(
        &self,
        root: &Path,
        targets: &[JumpTarget],
        max_tokens: usize,
    ) -> Vec<MiniBundleItem> {
        let mut texts: HashMap<&str, Option<String>> = HashMap::new();
        let mut remaining = max_tokens;
        let mut out = Vec::new();

        for target in targets {
            if remaining == 0 {
                break;
            }
            if !texts.contains_key(target.file.as_str()) {
                let text = tokio::fs::read_to_string(root.join(&target.file)).await.ok();
                if text.is_none() {
                    log::debug!("Bundle assembler skipped unreadable {}", target.file);
                }
                texts.insert(target.file.as_str(), text);
            }
            let Some(Some(text)) = texts.get(target.file.as_str()) else {
                continue;
            };

            let snippet = truncate_to_tokens(&self.cut(text, target), remaining);
            if snippet.trim().is_empty() {
                continue;
            }
            remaining = remaining.saturating_sub(estimate_tokens(&snippet));
            out.push(MiniBundleItem {
                file: target.file.clone(),
                symbol: target.symbol.clone(),
                byte_len: snippet.len(),
                snippet,
            });
        }
        out
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileNameFingerprinter;

#[async_trait]
impl RepoFingerprinter for FileNameFingerprinter {
    async fn fingerprint(&self, files: &[String]) -> RepoFingerprint {
        fingerprint_files(files)
    }
}

/// Everything the pipeline delegates to, injected once at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub index_loader: Arc<dyn ProjectIndexLoader>,
    pub structural_search: Arc<dyn StructuralSearch>,
    pub import_graph: Arc<dyn ImportGraphBuilder>,
    pub bundle_assembler: Arc<dyn BundleAssembler>,
    pub fingerprinter: Arc<dyn RepoFingerprinter>,
    /// Detectors; each one only runs for its own topics.
    pub matchers: Vec<Arc<dyn Matcher>>,
}

impl Collaborators {
    /// Indexer, tree-sitter search, petgraph imports, file snippets and the
    /// route/component/schema detectors.
    pub fn default_stack(config: &EngineConfig) -> Self {
        Self {
            index_loader: Arc::new(IndexCacheLoader::new(config.index_cache_capacity)),
            structural_search: Arc::new(SyntaxStructuralSearch),
            import_graph: Arc::new(ContextImportGraph),
            bundle_assembler: Arc::new(SnippetAssembler::new(config.max_snippet_lines)),
            fingerprinter: Arc::new(FileNameFingerprinter),
            matchers: default_matchers(),
        }
    }

    #[must_use]
    pub fn with_index_loader(mut self, loader: Arc<dyn ProjectIndexLoader>) -> Self {
        self.index_loader = loader;
        self
    }

    #[must_use]
    pub fn with_structural_search(mut self, search: Arc<dyn StructuralSearch>) -> Self {
        self.structural_search = search;
        self
    }

    #[must_use]
    pub fn with_bundle_assembler(mut self, assembler: Arc<dyn BundleAssembler>) -> Self {
        self.bundle_assembler = assembler;
        self
    }

    #[must_use]
    pub fn with_matchers(mut self, matchers: Vec<Arc<dyn Matcher>>) -> Self {
        self.matchers = matchers;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::default_stack(&EngineConfig::default())
    }
}

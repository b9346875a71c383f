use crate::query::StructuralQuery;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_SIMILAR_CHUNKS: usize = 20;
pub const MAX_SIMILAR_CHUNKS_LIMIT: usize = 20;
pub const DEFAULT_MAX_TOKENS: usize = 3_000;

/// Request for the local context engine.
///
/// `project_path` and `query` are required; they are optional here so that a missing
/// field surfaces as a validation error from the engine rather than a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalContextRequest {
    #[serde(default)]
    pub project_path: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    /// `understand` (default), `debug`, `implement` or `review`.
    #[serde(default)]
    pub task_type: Option<String>,
    /// Default 20, clamped to 1..=20.
    #[serde(default)]
    pub max_similar_chunks: Option<usize>,
    /// Token budget for the mini bundle (default 3000).
    #[serde(default)]
    pub max_tokens: Option<usize>,
    /// Attack plan name, `auto` by default.
    #[serde(default)]
    pub attack_plan: Option<String>,
    #[serde(default)]
    pub ast_queries: Vec<StructuralQuery>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub use_project_hints_cache: Option<bool>,
    #[serde(default)]
    pub debug: bool,
}

impl LocalContextRequest {
    #[must_use]
    pub fn new(project_path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            project_path: Some(project_path.into()),
            query: Some(query.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attack_plan(mut self, plan: impl Into<String>) -> Self {
        self.attack_plan = Some(plan.into());
        self
    }

    #[must_use]
    pub fn with_task_type(mut self, task: impl Into<String>) -> Self {
        self.task_type = Some(task.into());
        self
    }

    #[must_use]
    pub fn with_max_similar_chunks(mut self, value: usize) -> Self {
        self.max_similar_chunks = Some(value);
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, value: usize) -> Self {
        self.max_tokens = Some(value);
        self
    }

    #[must_use]
    pub fn with_exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_ast_queries(mut self, queries: Vec<StructuralQuery>) -> Self {
        self.ast_queries = queries;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn effective_max_similar_chunks(&self) -> usize {
        self.max_similar_chunks
            .unwrap_or(DEFAULT_MAX_SIMILAR_CHUNKS)
            .clamp(1, MAX_SIMILAR_CHUNKS_LIMIT)
    }

    #[must_use]
    pub fn effective_max_tokens(&self) -> usize {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    #[must_use]
    pub fn use_cache(&self) -> bool {
        self.use_project_hints_cache.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_similar_chunks_is_clamped() {
        let base = LocalContextRequest::new("/repo", "q");
        assert_eq!(base.effective_max_similar_chunks(), 20);
        assert_eq!(
            base.clone()
                .with_max_similar_chunks(50)
                .effective_max_similar_chunks(),
            20
        );
        assert_eq!(
            base.with_max_similar_chunks(0)
                .effective_max_similar_chunks(),
            1
        );
    }

    #[test]
    fn camel_case_fields_parse() {
        let request: LocalContextRequest = serde_json::from_str(
            r#"{"projectPath":"/repo","query":"auth","maxTokens":100,"excludePatterns":["**/auth/**"]}"#,
        )
        .unwrap();
        assert_eq!(request.project_path.as_deref(), Some("/repo"));
        assert_eq!(request.effective_max_tokens(), 100);
        assert_eq!(request.exclude_patterns, vec!["**/auth/**".to_string()]);
        assert!(request.use_cache());
    }
}

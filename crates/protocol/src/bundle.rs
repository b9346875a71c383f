use serde::{Deserialize, Serialize};

/// Filename-only heuristic classification of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RepoFingerprint {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub families: Vec<String>,
    /// Short hex digest of the sorted file list.
    pub digest: String,
}

/// Highest-scoring location for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub file: String,
    pub symbol: String,
    pub start: usize,
    pub end: usize,
    pub score: f32,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageEntry {
    pub bucket: String,
    pub count: usize,
    pub minimum: usize,
    pub satisfied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedExcerpt {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDebug {
    pub plan: String,
    pub queries: usize,
    pub files_considered: usize,
    pub candidates: usize,
    pub ranked: usize,
}

/// LLM-ready retrieval bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalBundle {
    pub topic: String,
    pub fingerprint: RepoFingerprint,
    pub anchors: Vec<Anchor>,
    pub neighbors: Vec<String>,
    pub coverage: Vec<CoverageEntry>,
    pub env_hints: Vec<String>,
    pub suggested_excerpts: Vec<SuggestedExcerpt>,
    pub summary_plan: Vec<String>,
    pub answer_frame: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<BundleDebug>,
}

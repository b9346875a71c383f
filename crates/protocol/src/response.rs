use crate::bundle::RetrievalBundle;
use serde::{Deserialize, Serialize};

/// Navigation hint returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpTarget {
    pub file: String,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    pub role: String,
    pub confidence: f32,
    #[serde(default)]
    pub why: Vec<String>,
}

/// Token-budgeted snippet for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniBundleItem {
    pub file: String,
    pub symbol: String,
    pub snippet: String,
    pub byte_len: usize,
}

/// Minimal, verifiable reference to source lines backing the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidencePointer {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub symbol: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NextMode {
    OpenFiles,
    #[default]
    RefineQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NextStep {
    pub mode: NextMode,
    pub open_files: Vec<String>,
    pub checks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub files_scanned: usize,
    pub symbols_considered: usize,
    pub original_tokens: usize,
    pub compacted_tokens: usize,
    pub bundle_tokens: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalContextResponse {
    pub success: bool,
    pub answer_draft: String,
    pub jump_targets: Vec<JumpTarget>,
    pub mini_bundle: Vec<MiniBundleItem>,
    pub next: NextStep,
    pub evidence: Vec<EvidencePointer>,
    pub metadata: ResponseMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_bundle: Option<RetrievalBundle>,
}

impl LocalContextResponse {
    /// Well-formed failure response: message in `answer_draft`, everything else empty or zero.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            answer_draft: message.into(),
            jump_targets: Vec::new(),
            mini_bundle: Vec::new(),
            next: NextStep::default(),
            evidence: Vec::new(),
            metadata: ResponseMetadata::default(),
            retrieval_bundle: None,
        }
    }
}

//! Wire types shared by the local context engine and its collaborators.
//!
//! Everything here is plain data: requests and responses, the structural query DSL,
//! the candidate shape every generator produces, path globs and token budgets.

mod budget;
mod bundle;
mod candidate;
mod error;
pub mod path_filters;
mod query;
mod request;
mod response;

pub use budget::{enforce_token_budget, estimate_tokens, truncate_to_tokens};
pub use bundle::{
    Anchor, BundleDebug, CoverageEntry, RepoFingerprint, RetrievalBundle, SuggestedExcerpt,
};
pub use candidate::{CandidateKind, CandidateSymbol, REASON_RETURNS_JSX};
pub use error::{ProtocolError, Result};
pub use path_filters::{normalize_rel_path, PathGlobs};
pub use query::{CompiledPattern, StructuralQuery, TextPattern};
pub use request::{
    LocalContextRequest, DEFAULT_MAX_SIMILAR_CHUNKS, DEFAULT_MAX_TOKENS, MAX_SIMILAR_CHUNKS_LIMIT,
};
pub use response::{
    EvidencePointer, JumpTarget, LocalContextResponse, MiniBundleItem, NextMode, NextStep,
    ResponseMetadata,
};

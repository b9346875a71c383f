//! # Context Engine
//!
//! Answers a natural-language question about a repository with ranked jump
//! targets, a token-budgeted mini bundle, a drafted answer and a retrieval bundle.
//!
//! ## Pipeline
//!
//! ```text
//! LocalContextRequest
//!     │ validate (paths, plan, task type, exclude globs)
//!     ├──> Topic + AttackPlan ──> StructuralQuery[]
//!     ├──> ProjectIndexLoader ──> ProjectContext ──> FilePrioritizer
//!     ├──> StructuralSearch (timeout) + detectors ──> candidates
//!     ├──> CandidateRanker ──> jump targets
//!     └──> BundleAssembler, answer draft, retrieval bundle
//!            └──> LocalContextResponse
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use context_engine::{EngineConfig, LocalContextEngine};
//! use context_protocol::LocalContextRequest;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = LocalContextEngine::new(EngineConfig::from_env());
//! let request = LocalContextRequest::new("/path/to/project", "database initialization");
//! let response = engine.run(&request).await?;
//! for target in &response.jump_targets {
//!     println!("{}:{:?} {}", target.file, target.start, target.symbol);
//! }
//! # Ok(())
//! # }
//! ```

mod answer;
mod bundle;
mod collaborators;
mod config;
mod error;
mod pipeline;

pub use answer::{
    draft_answer, find_template, render_template, AnswerInputs, AnswerTemplate, TEMPLATES,
    UNKNOWN_MARKER,
};
pub use bundle::{
    build_retrieval_bundle, coverage, env_hints, select_anchors, suggested_excerpts,
    BundleInputs, AUTH_ENV_HINTS, MAX_ANCHORS, MAX_ENV_HINTS, MAX_NEIGHBORS,
};
pub use collaborators::{
    BundleAssembler, Collaborators, ContextImportGraph, FileNameFingerprinter, ImportGraphBuilder,
    IndexCacheLoader, ProjectIndexLoader, RepoFingerprinter, SnippetAssembler, StructuralSearch,
    SyntaxStructuralSearch,
};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use pipeline::LocalContextEngine;

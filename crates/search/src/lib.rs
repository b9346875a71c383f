//! # Context Search
//!
//! Deterministic retrieval and ranking for code questions.
//!
//! ```text
//! query ──> Topic ──> AttackPlan ──> StructuralQuery[]
//!             │
//!             └──> FilePrioritizer (stoplist, excludes, topic hints)
//!
//! candidates (structural search + detectors)
//!     └──> CandidateRanker (seven signals, stable sort, diversity cap)
//!            └──> select_jump_targets
//! ```

mod detectors;
mod error;
mod plan;
mod prioritize;
mod rerank;
mod signals;
mod targets;
mod topic;

pub use detectors::{
    active_matchers, default_matchers, run_detectors, ComponentMatcher, Matcher, RouteMatcher,
    SchemaMatcher, COMPONENT_CONFIDENCE, DEFAULT_DETECTOR_BATCH, ROLE_CONFIG, ROLE_INTERFACE,
    ROLE_REQUEST_HANDLER, ROUTE_CONFIDENCE, SCHEMA_CONFIDENCE,
};
pub use error::{Result, SearchError};
pub use plan::{
    compile_queries, plan_scores, query_tokens, select_plan, AttackPlan, TaskType,
};
pub use prioritize::{stoplist_for, FilePrioritizer};
pub use rerank::{apply_diversity, CandidateRanker, RankedCandidate, MAX_PER_FILE, MAX_RANKED};
pub use signals::{
    mentions_ui, recency_for_age, FixedRecency, FsRecency, QuerySignals, RecencySource,
    ScoreBreakdown, ScoreWeights, SCORE_WEIGHTS,
};
pub use targets::{infer_role, select_jump_targets, FALLBACK_REASON};
pub use topic::{classify_topic, Topic};

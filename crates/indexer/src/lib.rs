//! # Context Indexer
//!
//! Turns a project directory into the read-only facts the local context engine
//! ranks against.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (.gitignore aware)
//!     │      └─> Sorted repo-relative paths
//!     │
//!     ├──> Fact Extractor (tree-sitter: TS/TSX/JS/Python/Rust)
//!     │      └─> Declarations, imports, calls, news, assignments
//!     │
//!     └──> Project Indexer
//!            └─> ProjectContext (exports, imports, routes, env, systems, call graph)
//! ```
//!
//! [`SyntaxSearch`] runs structural queries over the same facts, and
//! [`fingerprint_files`] classifies a repository from file names only.
//!
//! ## Example
//!
//! ```no_run
//! use context_indexer::ProjectIndexer;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ProjectIndexer::new("/path/to/project")?.load()?;
//!     println!("{} files, {} exports", context.files.len(), context.exports.len());
//!     Ok(())
//! }
//! ```

mod cache;
mod context;
mod env_keys;
mod error;
mod facts;
mod fingerprint;
mod language;
mod loader;
mod routes;
mod scanner;
mod structural;
mod systems;

pub use cache::{compute_watermark, ProjectIndexCache, DEFAULT_CACHE_CAPACITY};
pub use context::{
    CallGraph, EnvRecord, ExportRecord, ImportRecord, ProjectContext, RouteRecord, SystemsInfo,
};
pub use env_keys::{is_dotenv_file, scan_dotenv, scan_env_access, EnvReference};
pub use error::{IndexerError, Result};
pub use facts::{
    AssignFact, CallFact, DeclKind, Declaration, FactExtractor, ImportFact, NewFact, SyntaxFacts,
};
pub use fingerprint::fingerprint_files;
pub use language::{language_name, SyntaxLanguage};
pub use loader::ProjectIndexer;
pub use routes::{file_router_path, routes_from_facts};
pub use scanner::{FileScanner, ScanOptions};
pub use structural::{SyntaxSearch, DEFAULT_MAX_MATCHES};
pub use systems::{detect_systems, languages_by_frequency, manifest_dependencies};

//! # Context Graph
//!
//! File-level import graph used to widen retrieval results by one hop.
//!
//! ## Architecture
//!
//! ```text
//! ProjectContext (files + import records)
//!     │
//!     ├──> Module Resolver
//!     │      ├─ Relative / aliased script specifiers
//!     │      ├─ Python dotted and relative modules
//!     │      └─ Rust crate:: / self:: / super:: paths
//!     │
//!     └──> Import Graph (petgraph)
//!            ├─ Nodes: repo-relative files
//!            ├─ Edges: importer -> imported
//!            └─ One-hop neighbor expansion for anchor files
//! ```

mod graph;
mod resolve;
mod types;

pub use graph::ImportGraph;
pub use resolve::ModuleResolver;
pub use types::ImportEdge;

use serde::{Deserialize, Serialize};

/// Edge from an importing file to the file its specifier resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEdge {
    /// Specifier as written in the source (e.g. `./database/connection`)
    pub specifier: String,

    /// 1-based line of the import statement
    pub line: usize,
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The request cannot be processed at all; nothing has run yet.
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Search error: {0}")]
    Search(#[from] context_search::SearchError),

    #[error("Indexer error: {0}")]
    Indexer(#[from] context_indexer::IndexerError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

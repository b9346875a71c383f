use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("Parser error for {language}: {message}")]
    ParserError {
        language: &'static str,
        message: String,
    },

    #[error("Manifest error: {0}")]
    ManifestError(#[from] serde_json::Error),

    #[error("Query error: {0}")]
    QueryError(#[from] context_protocol::ProtocolError),

    #[error("{0}")]
    Other(String),
}

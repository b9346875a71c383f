use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Unknown attack plan: {0}")]
    UnknownPlan(String),

    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("Invalid path pattern: {0}")]
    InvalidPattern(#[from] context_protocol::ProtocolError),

    #[error("{0}")]
    Other(String),
}

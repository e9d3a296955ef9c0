use thiserror::Error;

#[derive(Error, Debug)]
pub enum BianzhengError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown syndrome element: {0}")]
    UnknownElementId(String),

    #[error("Unknown syndrome pattern: {0}")]
    UnknownPattern(String),

    #[error("Unknown evolution node: {0}")]
    UnknownNode(String),

    #[error("Unknown evolution chain: {0}")]
    UnknownChain(String),

    #[error("Malformed evolution graph document: {0}")]
    MalformedGraphDocument(String),

    #[error("Invalid record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Duplicate evolution edge: {from} -> {to}")]
    DuplicateEdge { from: String, to: String },

    #[error("Record source error: {0}")]
    Source(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BianzhengError {
    pub fn invalid_record(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

impl From<anyhow::Error> for BianzhengError {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, BianzhengError>;

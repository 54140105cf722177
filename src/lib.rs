use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl BoardError {
    /// Wrap a lower-level storage failure, keeping its context chain
    #[inline]
    pub fn database(error: &anyhow::Error) -> Self {
        Self::Database(format!("{:#}", error))
    }
}

impl From<config::ConfigError> for BoardError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

pub mod assistant;
pub mod board;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod database;
pub mod embeddings;
pub mod indexer;
pub mod retrieval;

#[cfg(test)]
mod test_support;

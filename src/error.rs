use thiserror::Error;

pub type Result<T> = std::result::Result<T, BoardError>;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Index {index} out of range for column {column} (len {len})")]
    InvalidIndex {
        column: String,
        index: usize,
        len: usize,
    },

    #[error("No order value fits between {before:?} and {after:?}")]
    OrderSpaceExhausted {
        before: Option<f64>,
        after: Option<f64>,
    },

    #[error("Invalid drag transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Remote store error: {0}")]
    Remote(#[from] anyhow::Error),

    #[error("Board storage not initialized")]
    NotInitialized,
}

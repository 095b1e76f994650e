use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid data type: expected {expected}, got {actual}")]
    InvalidDataType { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;

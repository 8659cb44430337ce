use thiserror::Error;

/// Common error type shared by the folio crates
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Failure of a key-value storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<String> for CommonError {
    fn from(s: String) -> Self {
        CommonError::Generic(s)
    }
}

impl From<&str> for CommonError {
    fn from(s: &str) -> Self {
        CommonError::Generic(s.to_string())
    }
}
